//! Deletion, trash cascade, and identifier recovery.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_core::traits::{IdentifierRegistry, SearchIndex};
use labvault_entity::audit::{LogAction, NewLogEntry};
use labvault_entity::node::{FileNode, TrashedFileNode};
use labvault_store::backend::{NodeStore, ProjectStore};

use crate::checkout;
use crate::context::Auth;
use crate::path;

/// Soft-deletes nodes and recovers identifiers from trashed subtrees.
#[derive(Clone)]
pub struct TrashService {
    /// Node store.
    nodes: Arc<dyn NodeStore>,
    /// Project store.
    projects: Arc<dyn ProjectStore>,
    /// Search index sink.
    search: Arc<dyn SearchIndex>,
    /// Global identifier registry.
    identifiers: Arc<dyn IdentifierRegistry>,
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        projects: Arc<dyn ProjectStore>,
        search: Arc<dyn SearchIndex>,
        identifiers: Arc<dyn IdentifierRegistry>,
    ) -> Self {
        Self {
            nodes,
            projects,
            search,
            identifiers,
        }
    }

    /// Soft-deletes a node, cascading over its subtree.
    ///
    /// Blocked while anyone other than the actor holds a checkout in the
    /// subtree. Deleting the project's preprint primary file flags the
    /// project as preprint-orphaned. Every descendant becomes a trashed
    /// record keeping its parent linkage, and every deleted file is
    /// removed from the search index.
    pub async fn delete(&self, auth: &Auth, node_id: Uuid) -> AppResult<TrashedFileNode> {
        let node = self
            .nodes
            .get_node(node_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;
        if node.is_root() {
            return Err(AppError::validation("The storage root cannot be deleted"));
        }

        if let Some(holder) =
            checkout::foreign_checkout_holder(self.nodes.as_ref(), &node, auth.user_id).await?
        {
            return Err(AppError::checked_out(format!(
                "Node {node_id} is checked out by user {holder}"
            )));
        }

        let project = self
            .projects
            .get_project(node.project_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Project {} not found", node.project_id))
            })?;
        if project.preprint_file_id == Some(node.id) {
            self.projects.mark_preprint_orphan(project.id).await?;
        }

        let materialized = path::materialized_path(self.nodes.as_ref(), &node).await?;
        let log = NewLogEntry::new(
            project.id,
            LogAction::FileRemoved,
            json!({"kind": node.kind, "node": node.id, "path": materialized}),
            auth.user_id,
        );

        let trashed = self
            .nodes
            .trash_subtree(node.id, Some(auth.user_id), log)
            .await?;
        for record in &trashed {
            if record.is_file() {
                self.search.remove_file(record.id).await?;
            }
        }

        info!(
            user_id = %auth.user_id,
            node_id = %node.id,
            trashed = trashed.len(),
            "Node deleted"
        );
        trashed
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Trash cascade returned no records"))
    }

    /// Collects the external identifiers of every file under a path.
    ///
    /// The path is the identifier-based node path (`/{id}/`). It resolves
    /// to a live node or, after deletion, to a trashed record; folders are
    /// walked recursively (live children through the tree relation,
    /// trashed children through the parent linkage kept by the trash
    /// table). A path that resolves to nothing yields an empty result.
    pub async fn collect_file_guids(&self, node_path: &str) -> AppResult<Vec<String>> {
        let Ok(id) = Uuid::parse_str(node_path.trim_matches('/')) else {
            return Ok(Vec::new());
        };

        enum Entry {
            Live(FileNode),
            Trashed(TrashedFileNode),
        }

        let start = match self.nodes.get_node(id).await? {
            Some(node) => Entry::Live(node),
            None => match self.nodes.get_trashed(id).await? {
                Some(record) => Entry::Trashed(record),
                None => return Ok(Vec::new()),
            },
        };

        let mut guids = Vec::new();
        let mut stack = vec![start];
        while let Some(entry) = stack.pop() {
            match entry {
                Entry::Live(node) if node.is_file() => {
                    if let Some(guid) = self.identifiers.resolve(node.id).await? {
                        guids.push(guid);
                    }
                }
                Entry::Live(node) => {
                    let children = self.nodes.children(node.id).await?;
                    stack.extend(children.into_iter().rev().map(Entry::Live));
                }
                Entry::Trashed(record) if record.is_file() => {
                    if let Some(guid) = self.identifiers.resolve(record.id).await? {
                        guids.push(guid);
                    }
                }
                Entry::Trashed(record) => {
                    let children = self.nodes.trashed_children(record.id).await?;
                    stack.extend(children.into_iter().rev().map(Entry::Trashed));
                }
            }
        }
        Ok(guids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labvault_core::error::ErrorKind;
    use labvault_store::backend::LogStore;

    use crate::testing::Harness;

    #[tokio::test]
    async fn test_delete_blocked_by_foreign_checkout() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let bob = h.writer().await;
        let service = h.trash_service();
        let folder = h.folder(h.root.id, "results").await;
        let file = h.file(folder.id, "data.csv").await;

        h.checkout_service()
            .set_checkout(&bob, file.id, Some(bob.user_id))
            .await
            .expect("checkout");

        let err = service.delete(&alice, folder.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CheckedOut);

        // The holder may delete their own checked-out subtree.
        service.delete(&bob, folder.id).await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_cascades_and_deindexes() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.trash_service();
        let folder = h.folder(h.root.id, "results").await;
        let nested = h.folder(folder.id, "run-1").await;
        let file_a = h.file(nested.id, "a.csv").await;
        let file_b = h.file(folder.id, "b.csv").await;

        h.backend.index_file(file_a.id).await.unwrap();
        h.backend.index_file(file_b.id).await.unwrap();

        let trashed_root = service.delete(&alice, folder.id).await.expect("delete");
        assert_eq!(trashed_root.id, folder.id);

        assert!(h.backend.get_node(folder.id).await.unwrap().is_none());
        assert!(h.backend.get_node(file_a.id).await.unwrap().is_none());
        assert!(!h.backend.is_indexed(file_a.id));
        assert!(!h.backend.is_indexed(file_b.id));

        let logs = h
            .backend
            .logs_for_project(h.project.id)
            .await
            .expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, LogAction::FileRemoved);
        assert_eq!(logs[0].params["path"], "/results/");
    }

    #[tokio::test]
    async fn test_deleting_preprint_file_orphans_project() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.trash_service();
        let file = h.file(h.root.id, "manuscript.pdf").await;
        let other = h.file(h.root.id, "extra.pdf").await;
        h.backend.set_preprint_file(h.project.id, file.id);

        service.delete(&alice, other.id).await.expect("delete");
        let project = h.backend.get_project(h.project.id).await.unwrap().unwrap();
        assert!(!project.is_preprint_orphan);

        service.delete(&alice, file.id).await.expect("delete");
        let project = h.backend.get_project(h.project.id).await.unwrap().unwrap();
        assert!(project.is_preprint_orphan);
    }

    #[tokio::test]
    async fn test_guid_collection_survives_deletion() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.trash_service();
        let folder = h.folder(h.root.id, "results").await;
        let nested = h.folder(folder.id, "run-1").await;
        let file_a = h.file(nested.id, "a.csv").await;
        let file_b = h.file(folder.id, "b.csv").await;
        let untagged = h.file(folder.id, "no-guid.csv").await;

        h.backend.assign_guid(file_a.id, "guid-a");
        h.backend.assign_guid(file_b.id, "guid-b");
        let _ = untagged;

        let before = service
            .collect_file_guids(&folder.id_path())
            .await
            .expect("guids");
        let mut before_sorted = before.clone();
        before_sorted.sort();
        assert_eq!(before_sorted, vec!["guid-a", "guid-b"]);

        service.delete(&alice, folder.id).await.expect("delete");

        let mut after = service
            .collect_file_guids(&folder.id_path())
            .await
            .expect("guids");
        after.sort();
        assert_eq!(after, before_sorted);
    }

    #[tokio::test]
    async fn test_guid_collection_on_unknown_path_is_empty() {
        let h = Harness::new().await;
        let service = h.trash_service();

        assert!(service.collect_file_guids("/not-a-uuid/").await.unwrap().is_empty());
        assert!(
            service
                .collect_file_guids(&format!("/{}/", Uuid::new_v4()))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_root_cannot_be_deleted() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.trash_service();

        let err = service.delete(&alice, h.root.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
