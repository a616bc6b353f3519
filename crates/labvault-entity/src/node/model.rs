//! File-node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use labvault_core::AppError;

/// Discriminant between the two node variants.
///
/// A single table holds both; behavior differences (version history,
/// children, derived checkout state) are dispatched on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "node_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A file holding an ordered sequence of versions.
    File,
    /// A folder holding child nodes.
    Folder,
}

impl NodeKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            _ => Err(AppError::validation(format!("Invalid node kind: '{s}'"))),
        }
    }
}

/// A named node in a project's storage tree.
///
/// The root node of every tree has an empty name and no parent. A node's
/// human-readable path is never stored; it is derived by walking parent
/// references (see the service layer's path module).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileNode {
    /// Unique node identifier.
    pub id: Uuid,
    /// The node name. Empty string for the root folder.
    pub name: String,
    /// The parent folder, `None` for the root.
    pub parent_id: Option<Uuid>,
    /// The project owning this tree.
    pub project_id: Uuid,
    /// Whether this node is a file or a folder.
    pub kind: NodeKind,
    /// The user holding the exclusive checkout lock, if any.
    pub checkout_user_id: Option<Uuid>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last updated.
    pub updated_at: DateTime<Utc>,
}

impl FileNode {
    /// Whether this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Whether this node is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether this node itself carries a checkout lock.
    ///
    /// Folders additionally report themselves checked out when any
    /// descendant is; that derived state needs store access and lives in
    /// the service layer.
    pub fn is_checked_out(&self) -> bool {
        self.checkout_user_id.is_some()
    }

    /// The identifier-based API path (`/{id}`, folders with a trailing
    /// slash).
    ///
    /// Distinct from the materialized (human-readable) path, which is
    /// derived from the ancestor chain by the service layer.
    pub fn id_path(&self) -> String {
        match self.kind {
            NodeKind::File => format!("/{}", self.id),
            NodeKind::Folder => format!("/{}/", self.id),
        }
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new file node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileNode {
    /// The node name. Empty string only for roots.
    pub name: String,
    /// The parent folder, `None` for roots.
    pub parent_id: Option<Uuid>,
    /// The project owning the tree.
    pub project_id: Uuid,
    /// File or folder.
    pub kind: NodeKind,
}
