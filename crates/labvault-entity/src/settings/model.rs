//! Per-project storage addon settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-project configuration of the storage addon.
///
/// Exactly one settings row exists per project. The root node is attached
/// lazily on first use and always carries the empty name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NodeSettings {
    /// Unique settings identifier.
    pub id: Uuid,
    /// The project this settings row belongs to.
    pub project_id: Uuid,
    /// The root folder of the project's storage tree, once attached.
    pub root_node_id: Option<Uuid>,
    /// When the settings row was created.
    pub created_at: DateTime<Utc>,
}
