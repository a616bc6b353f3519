//! Node materialization, move, and serialization.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_entity::audit::{LogAction, NewLogEntry};
use labvault_entity::node::{CreateFileNode, FileNode, NodeKind};
use labvault_store::backend::{NodeStore, VersionStore};

use crate::checkout;
use crate::context::Auth;
use crate::path;

/// Node-level operations: materialize path segments, move nodes, and
/// produce the serialized view callers expose.
#[derive(Clone)]
pub struct NodeService {
    /// Node store.
    nodes: Arc<dyn NodeStore>,
    /// Version store (serialization view).
    versions: Arc<dyn VersionStore>,
}

impl NodeService {
    /// Creates a new node service.
    pub fn new(nodes: Arc<dyn NodeStore>, versions: Arc<dyn VersionStore>) -> Self {
        Self { nodes, versions }
    }

    /// Finds a live child of `parent` by name, materializing it when the
    /// segment does not exist yet.
    ///
    /// An existing child of a different kind is a conflict, not a match.
    pub async fn get_or_create(
        &self,
        project: Uuid,
        parent: Uuid,
        name: &str,
        kind: NodeKind,
    ) -> AppResult<FileNode> {
        if name.is_empty() || name.contains('/') {
            return Err(AppError::validation(format!("Invalid node name: '{name}'")));
        }
        let parent_node = self
            .nodes
            .get_node_in_project(parent, project)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {parent} not found")))?;
        if parent_node.kind != NodeKind::Folder {
            return Err(AppError::validation(format!(
                "Node {parent} is not a folder"
            )));
        }

        if let Some(existing) = self.nodes.child_by_name(parent, name).await? {
            if existing.kind != kind {
                return Err(AppError::conflict(format!(
                    "Node '{name}' already exists as a {}",
                    existing.kind
                )));
            }
            return Ok(existing);
        }

        self.nodes
            .insert_node(CreateFileNode {
                name: name.to_string(),
                parent_id: Some(parent),
                project_id: project,
                kind,
            })
            .await
    }

    /// Moves a node under a new parent, optionally renaming it.
    ///
    /// Blocked while anyone other than the actor holds a checkout anywhere
    /// in the node's subtree. The target must be a folder in the same
    /// project and must not sit inside the moved subtree.
    pub async fn move_under(
        &self,
        auth: &Auth,
        node_id: Uuid,
        new_parent: Uuid,
        new_name: Option<&str>,
    ) -> AppResult<FileNode> {
        let node = self
            .nodes
            .get_node(node_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;
        if node.is_root() {
            return Err(AppError::validation("The storage root cannot be moved"));
        }
        if let Some(name) = new_name {
            if name.is_empty() || name.contains('/') {
                return Err(AppError::validation(format!("Invalid node name: '{name}'")));
            }
        }

        if let Some(holder) =
            checkout::foreign_checkout_holder(self.nodes.as_ref(), &node, auth.user_id).await?
        {
            return Err(AppError::checked_out(format!(
                "Node {node_id} is checked out by user {holder}"
            )));
        }

        let target = self
            .nodes
            .get_node(new_parent)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {new_parent} not found")))?;
        if target.kind != NodeKind::Folder {
            return Err(AppError::validation(format!(
                "Node {new_parent} is not a folder"
            )));
        }
        if target.project_id != node.project_id {
            return Err(AppError::validation(
                "Nodes cannot be moved across projects",
            ));
        }

        // Walking the target's ancestor chain catches moving a folder
        // beneath itself.
        let mut ancestor = Some(target.clone());
        while let Some(current) = ancestor {
            if current.id == node.id {
                return Err(AppError::validation(
                    "A folder cannot be moved into its own subtree",
                ));
            }
            ancestor = match current.parent_id {
                Some(parent_id) => self.nodes.get_node(parent_id).await?,
                None => None,
            };
        }

        let source_path = path::materialized_path(self.nodes.as_ref(), &node).await?;
        let destination_path = path::materialized_path(self.nodes.as_ref(), &target).await?;
        let log = NewLogEntry::new(
            node.project_id,
            LogAction::FileMoved,
            json!({
                "kind": node.kind,
                "node": node.id,
                "source": source_path,
                "destination": destination_path,
            }),
            auth.user_id,
        );

        let moved = self
            .nodes
            .set_parent_and_name(node.id, target.id, new_name.map(String::from), log)
            .await?;

        info!(
            user_id = %auth.user_id,
            node_id = %node.id,
            destination = %target.id,
            "Node moved"
        );
        Ok(moved)
    }

    /// The serialized JSON view of a node.
    ///
    /// Files carry their version count and the latest version's checksums;
    /// `include_full` adds the materialized path, which costs an ancestor
    /// walk.
    pub async fn serialize(&self, node_id: Uuid, include_full: bool) -> AppResult<serde_json::Value> {
        let node = self
            .nodes
            .get_node(node_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;

        let mut view = json!({
            "id": node.id,
            "name": node.name,
            "kind": node.kind,
            "path": node.id_path(),
        });
        if include_full {
            view["fullPath"] =
                json!(path::materialized_path(self.nodes.as_ref(), &node).await?);
        }
        if node.is_file() {
            let history = self.versions.versions_for(node.id).await?;
            let latest = history.last();
            view["version"] = json!(history.len());
            view["md5"] = json!(latest.and_then(|v| v.md5()));
            view["sha256"] = json!(latest.and_then(|v| v.sha256()));
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labvault_core::error::ErrorKind;
    use labvault_entity::version::VersionLocation;

    use crate::testing::Harness;

    #[tokio::test]
    async fn test_get_or_create_materializes_once() {
        let h = Harness::new().await;
        let service = h.node_service();

        let created = service
            .get_or_create(h.project.id, h.root.id, "data.csv", NodeKind::File)
            .await
            .expect("create");
        let fetched = service
            .get_or_create(h.project.id, h.root.id, "data.csv", NodeKind::File)
            .await
            .expect("fetch");
        assert_eq!(created.id, fetched.id);

        let err = service
            .get_or_create(h.project.id, h.root.id, "data.csv", NodeKind::Folder)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_bad_names() {
        let h = Harness::new().await;
        let service = h.node_service();

        for name in ["", "a/b"] {
            let err = service
                .get_or_create(h.project.id, h.root.id, name, NodeKind::File)
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_move_under_updates_path() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.node_service();
        let archive = h.folder(h.root.id, "archive").await;
        let file = h.file(h.root.id, "data.csv").await;

        let moved = service
            .move_under(&alice, file.id, archive.id, None)
            .await
            .expect("move");
        assert_eq!(moved.parent_id, Some(archive.id));
        assert_eq!(
            path::materialized_path(h.backend.as_ref(), &moved)
                .await
                .unwrap(),
            "/archive/data.csv"
        );
    }

    #[tokio::test]
    async fn test_move_blocked_by_foreign_checkout() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let bob = h.writer().await;
        let service = h.node_service();
        let checkout = h.checkout_service();
        let archive = h.folder(h.root.id, "archive").await;
        let folder = h.folder(h.root.id, "results").await;
        let file = h.file(folder.id, "data.csv").await;

        checkout
            .set_checkout(&bob, file.id, Some(bob.user_id))
            .await
            .expect("checkout");

        // A foreign lock anywhere in the subtree blocks the move...
        let err = service
            .move_under(&alice, folder.id, archive.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CheckedOut);

        // ...but the lock holder may move it.
        service
            .move_under(&bob, folder.id, archive.id, None)
            .await
            .expect("move by holder");
    }

    #[tokio::test]
    async fn test_move_into_own_subtree_rejected() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.node_service();
        let outer = h.folder(h.root.id, "outer").await;
        let inner = h.folder(outer.id, "inner").await;

        let err = service
            .move_under(&alice, outer.id, inner.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_serialize_file_view() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.node_service();
        let versions = h.version_service();
        let file = h.file(h.root.id, "data.csv").await;

        let mut location = VersionLocation::new("filesystem", "obj-1");
        location.container = Some("vault".to_string());
        versions
            .create_version(
                &alice,
                file.id,
                location,
                Some(&json!({"md5": "abc", "sha256": "def", "size": 10})),
            )
            .await
            .expect("version");

        let view = service.serialize(file.id, true).await.expect("serialize");
        assert_eq!(view["version"], 1);
        assert_eq!(view["md5"], "abc");
        assert_eq!(view["sha256"], "def");
        assert_eq!(view["fullPath"], "/data.csv");
        assert_eq!(view["path"], format!("/{}", file.id));
    }
}
