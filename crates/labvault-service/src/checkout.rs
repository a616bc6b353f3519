//! Checkout (exclusive lock) rules.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_core::traits::PermissionOracle;
use labvault_core::types::permission::PermissionLevel;
use labvault_entity::audit::{LogAction, NewLogEntry};
use labvault_entity::node::{FileNode, NodeKind};
use labvault_store::backend::{NodeStore, ProjectStore};

use crate::context::Auth;
use crate::path;

/// The user a node reports as its checkout holder, derived.
///
/// A file reports its own lock. A folder reports itself checked out when
/// it or any descendant is; this returns the first holder found.
pub async fn derived_checkout_holder(
    nodes: &dyn NodeStore,
    node: &FileNode,
) -> AppResult<Option<Uuid>> {
    if let Some(holder) = node.checkout_user_id {
        return Ok(Some(holder));
    }
    if node.kind == NodeKind::File {
        return Ok(None);
    }
    let mut stack = vec![node.id];
    while let Some(id) = stack.pop() {
        for child in nodes.children(id).await? {
            if let Some(holder) = child.checkout_user_id {
                return Ok(Some(holder));
            }
            if child.kind == NodeKind::Folder {
                stack.push(child.id);
            }
        }
    }
    Ok(None)
}

/// Whether a node (or, for folders, any descendant) is checked out.
pub async fn is_checked_out(nodes: &dyn NodeStore, node: &FileNode) -> AppResult<bool> {
    Ok(derived_checkout_holder(nodes, node).await?.is_some())
}

/// The first checkout holder in `node`'s subtree who is not `actor`.
///
/// Delete and move are blocked exactly when this returns a holder.
pub(crate) async fn foreign_checkout_holder(
    nodes: &dyn NodeStore,
    node: &FileNode,
    actor: Uuid,
) -> AppResult<Option<Uuid>> {
    if let Some(holder) = node.checkout_user_id {
        if holder != actor {
            return Ok(Some(holder));
        }
    }
    if node.kind == NodeKind::File {
        return Ok(None);
    }
    let mut stack = vec![node.id];
    while let Some(id) = stack.pop() {
        for child in nodes.children(id).await? {
            if let Some(holder) = child.checkout_user_id {
                if holder != actor {
                    return Ok(Some(holder));
                }
            }
            if child.kind == NodeKind::Folder {
                stack.push(child.id);
            }
        }
    }
    Ok(None)
}

/// Applies checkout transitions with permission and conflict rules.
#[derive(Clone)]
pub struct CheckoutService {
    /// Node store.
    nodes: Arc<dyn NodeStore>,
    /// Project store (log parameters).
    projects: Arc<dyn ProjectStore>,
    /// Permission oracle.
    oracle: Arc<dyn PermissionOracle>,
}

impl CheckoutService {
    /// Creates a new checkout service.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        projects: Arc<dyn ProjectStore>,
        oracle: Arc<dyn PermissionOracle>,
    ) -> Self {
        Self {
            nodes,
            projects,
            oracle,
        }
    }

    /// Updates a node's checkout holder to `target` (a user to check out,
    /// `None` to check in).
    ///
    /// The actor needs write permission on the owning project, and admin
    /// permission to act on a node checked out by someone else. Only
    /// meaningful transitions mutate and log: checking in a checked-out
    /// node, or checking out a free one. A request that leaves the node in
    /// its current state is a no-op and produces no audit entry.
    pub async fn set_checkout(
        &self,
        auth: &Auth,
        node_id: Uuid,
        target: Option<Uuid>,
    ) -> AppResult<FileNode> {
        let node = self
            .nodes
            .get_node(node_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;

        let perms = self
            .oracle
            .permissions_of(auth.user_id, node.project_id)
            .await?;
        let held_by_other =
            node.is_checked_out() && node.checkout_user_id != Some(auth.user_id);
        if (held_by_other && !PermissionLevel::Admin.satisfied_by(&perms))
            || !PermissionLevel::Write.satisfied_by(&perms)
        {
            return Err(AppError::checked_out(format!(
                "User {} may not change the checkout of node {node_id}",
                auth.user_id
            )));
        }

        let checking_out = target.is_some();
        if node.is_checked_out() == checking_out {
            // Already in the requested state: no mutation, no audit entry.
            return Ok(node);
        }

        let project = self
            .projects
            .get_project(node.project_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Project {} not found", node.project_id))
            })?;
        let action = if checking_out {
            LogAction::CheckedOut
        } else {
            LogAction::CheckedIn
        };
        let materialized = path::materialized_path(self.nodes.as_ref(), &node).await?;
        let log = NewLogEntry::new(
            project.id,
            action,
            json!({
                "kind": node.kind,
                "project": project.parent_id,
                "node": project.id,
                "path": materialized,
            }),
            auth.user_id,
        );

        let updated = self
            .nodes
            .set_checkout(node.id, target, node.checkout_user_id, log)
            .await?;

        info!(
            user_id = %auth.user_id,
            node_id = %node.id,
            action = %action,
            "Checkout state changed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labvault_core::error::ErrorKind;
    use labvault_store::backend::LogStore;

    use crate::testing::Harness;

    #[tokio::test]
    async fn test_checkout_then_foreign_checkout_fails() {
        let h = Harness::new().await;
        let file = h.file(h.root.id, "data.csv").await;
        let alice = h.writer().await;
        let bob = h.writer().await;
        let service = h.checkout_service();

        let node = service
            .set_checkout(&alice, file.id, Some(alice.user_id))
            .await
            .expect("checkout");
        assert_eq!(node.checkout_user_id, Some(alice.user_id));

        let err = service
            .set_checkout(&bob, file.id, Some(bob.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CheckedOut);
    }

    #[tokio::test]
    async fn test_admin_can_check_in_foreign_lock() {
        let h = Harness::new().await;
        let file = h.file(h.root.id, "data.csv").await;
        let alice = h.writer().await;
        let admin = h.admin().await;
        let service = h.checkout_service();

        service
            .set_checkout(&alice, file.id, Some(alice.user_id))
            .await
            .expect("checkout");
        let node = service
            .set_checkout(&admin, file.id, None)
            .await
            .expect("forced check-in");
        assert_eq!(node.checkout_user_id, None);
    }

    #[tokio::test]
    async fn test_write_permission_required() {
        let h = Harness::new().await;
        let file = h.file(h.root.id, "data.csv").await;
        let reader = h.reader().await;
        let service = h.checkout_service();

        let err = service
            .set_checkout(&reader, file.id, Some(reader.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CheckedOut);
    }

    #[tokio::test]
    async fn test_noop_transitions_produce_no_log() {
        let h = Harness::new().await;
        let file = h.file(h.root.id, "data.csv").await;
        let alice = h.writer().await;
        let service = h.checkout_service();

        // Checking in an already-free node changes nothing.
        service
            .set_checkout(&alice, file.id, None)
            .await
            .expect("no-op check-in");
        assert!(
            h.backend
                .logs_for_project(h.project.id)
                .await
                .expect("logs")
                .is_empty()
        );

        // A real transition logs once; repeating it does not log again.
        service
            .set_checkout(&alice, file.id, Some(alice.user_id))
            .await
            .expect("checkout");
        service
            .set_checkout(&alice, file.id, Some(alice.user_id))
            .await
            .expect("no-op checkout");
        let logs = h
            .backend
            .logs_for_project(h.project.id)
            .await
            .expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, LogAction::CheckedOut);
        assert_eq!(logs[0].params["path"], "/data.csv");

        // Checking in their own lock is a meaningful transition again.
        let node = service
            .set_checkout(&alice, file.id, None)
            .await
            .expect("check-in");
        assert_eq!(node.checkout_user_id, None);
        let logs = h
            .backend
            .logs_for_project(h.project.id)
            .await
            .expect("logs");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].action, LogAction::CheckedIn);
    }

    #[tokio::test]
    async fn test_folder_reports_descendant_checkout() {
        let h = Harness::new().await;
        let folder = h.folder(h.root.id, "results").await;
        let nested = h.folder(folder.id, "run-1").await;
        let file = h.file(nested.id, "data.csv").await;
        let alice = h.writer().await;
        let service = h.checkout_service();

        assert!(!is_checked_out(h.backend.as_ref(), &folder).await.unwrap());
        service
            .set_checkout(&alice, file.id, Some(alice.user_id))
            .await
            .expect("checkout");
        let folder = h.backend.get_node(folder.id).await.unwrap().unwrap();
        assert!(is_checked_out(h.backend.as_ref(), &folder).await.unwrap());
        assert_eq!(
            derived_checkout_holder(h.backend.as_ref(), &folder)
                .await
                .unwrap(),
            Some(alice.user_id)
        );
    }
}
