//! Trashed file-node entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::model::NodeKind;

/// A soft-deleted file node.
///
/// Trashed records are append-only and keep the identifier and parent
/// linkage the live node had, so descendant identifiers stay recoverable
/// after a cascading folder deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrashedFileNode {
    /// The identifier the live node had.
    pub id: Uuid,
    /// The node name at deletion time.
    pub name: String,
    /// The parent the node had at deletion time.
    pub parent_id: Option<Uuid>,
    /// The project owning the tree.
    pub project_id: Uuid,
    /// Whether the node was a file or a folder.
    pub kind: NodeKind,
    /// The user who deleted the node, if known.
    pub deleted_by: Option<Uuid>,
    /// When the node was trashed.
    pub deleted_at: DateTime<Utc>,
}

impl TrashedFileNode {
    /// Whether the trashed node was a file.
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}
