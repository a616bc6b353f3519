//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use labvault_core::AppError;

/// The auditable storage actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "log_action")]
pub enum LogAction {
    /// A node was checked out.
    #[serde(rename = "file.checked_out")]
    #[sqlx(rename = "file.checked_out")]
    CheckedOut,
    /// A node was checked back in.
    #[serde(rename = "file.checked_in")]
    #[sqlx(rename = "file.checked_in")]
    CheckedIn,
    /// A tag was attached to a file.
    #[serde(rename = "file.tag_added")]
    #[sqlx(rename = "file.tag_added")]
    TagAdded,
    /// A tag was detached from a file.
    #[serde(rename = "file.tag_removed")]
    #[sqlx(rename = "file.tag_removed")]
    TagRemoved,
    /// A node (and its descendants) was trashed.
    #[serde(rename = "file.removed")]
    #[sqlx(rename = "file.removed")]
    FileRemoved,
    /// A node was moved under a new parent.
    #[serde(rename = "file.moved")]
    #[sqlx(rename = "file.moved")]
    FileMoved,
    /// A file received its first version.
    #[serde(rename = "file.created")]
    #[sqlx(rename = "file.created")]
    FileCreated,
}

impl LogAction {
    /// Return the action as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckedOut => "file.checked_out",
            Self::CheckedIn => "file.checked_in",
            Self::TagAdded => "file.tag_added",
            Self::TagRemoved => "file.tag_removed",
            Self::FileRemoved => "file.removed",
            Self::FileMoved => "file.moved",
            Self::FileCreated => "file.created",
        }
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file.checked_out" => Ok(Self::CheckedOut),
            "file.checked_in" => Ok(Self::CheckedIn),
            "file.tag_added" => Ok(Self::TagAdded),
            "file.tag_removed" => Ok(Self::TagRemoved),
            "file.removed" => Ok(Self::FileRemoved),
            "file.moved" => Ok(Self::FileMoved),
            "file.created" => Ok(Self::FileCreated),
            _ => Err(AppError::validation(format!("Invalid log action: '{s}'"))),
        }
    }
}

/// An immutable project-level audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageLogEntry {
    /// Unique log entry identifier.
    pub id: Uuid,
    /// The project the action happened on.
    pub project_id: Uuid,
    /// The action that was performed.
    pub action: LogAction,
    /// Action parameters (node, path, tag, ...).
    pub params: serde_json::Value,
    /// The acting user, if the action was user-initiated.
    pub actor_id: Option<Uuid>,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new audit log entry.
///
/// When a log entry accompanies a state change, the store writes both
/// inside the same transaction so neither exists without the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogEntry {
    /// The project the action happened on.
    pub project_id: Uuid,
    /// The action performed.
    pub action: LogAction,
    /// Action parameters.
    pub params: serde_json::Value,
    /// The acting user.
    pub actor_id: Option<Uuid>,
}

impl NewLogEntry {
    /// Create a log entry for a user-initiated action.
    pub fn new(
        project_id: Uuid,
        action: LogAction,
        params: serde_json::Value,
        actor_id: Uuid,
    ) -> Self {
        Self {
            project_id,
            action,
            params,
            actor_id: Some(actor_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [
            LogAction::CheckedOut,
            LogAction::CheckedIn,
            LogAction::TagAdded,
            LogAction::TagRemoved,
            LogAction::FileRemoved,
            LogAction::FileMoved,
            LogAction::FileCreated,
        ] {
            let parsed: LogAction = action.as_str().parse().expect("should parse");
            assert_eq!(parsed, action);
        }
    }

    #[test]
    fn test_action_serde_uses_wire_string() {
        let json = serde_json::to_string(&LogAction::CheckedOut).expect("serialize");
        assert_eq!(json, "\"file.checked_out\"");
    }
}
