//! Tag entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A free-form label attachable to files.
///
/// The label itself is the tag's identity; the registry deduplicates on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    /// The tag label.
    pub label: String,
    /// When the tag was first created.
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a tag with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            created_at: Utc::now(),
        }
    }
}
