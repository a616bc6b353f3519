//! Project entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The generic project entity owning a storage tree.
///
/// Only the fields the storage rules read are modeled here: the
/// registration flag freezes tag mutation, the preprint file reference
/// drives the orphan flag on deletion, and the `institution_*` columns back
/// the [`Institution`](super::Institution) projection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    /// Unique project identifier.
    pub id: Uuid,
    /// Project title. Doubles as the institution name for institution rows.
    pub title: String,
    /// Project description.
    pub description: Option<String>,
    /// The parent project for components, if any.
    pub parent_id: Option<Uuid>,
    /// Whether this project is an immutable registration snapshot.
    pub is_registration: bool,
    /// Whether this project has been deleted.
    pub is_deleted: bool,
    /// The file currently designated as the project's preprint primary file.
    pub preprint_file_id: Option<Uuid>,
    /// Set when the preprint primary file was deleted out from under the
    /// project.
    pub is_preprint_orphan: bool,
    /// Institution identifier; set only on rows backing the institution
    /// projection.
    pub institution_id: Option<String>,
    /// Institution shield logo file name.
    pub institution_logo_name: Option<String>,
    /// Institution banner file name.
    pub institution_banner_name: Option<String>,
    /// Institution authentication endpoint.
    pub institution_auth_url: Option<String>,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// When the project was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether this row backs the institution projection.
    pub fn is_institution(&self) -> bool {
        self.institution_id.is_some()
    }
}
