//! Institution projection over the project table.
//!
//! Institutions share a table with projects (rows where `institution_id`
//! is set). Rather than a dynamic attribute-translation adapter, the
//! projection is an explicit read-only view type; lookups are a single
//! query filter (`institution_id IS NOT NULL AND NOT is_deleted`) applied
//! by the project store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Project;

/// Read-only view of a project row acting as an institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    /// The short institution identifier (distinct from the row's UUID).
    pub id: String,
    /// The backing project row's UUID.
    pub project_id: Uuid,
    /// Institution display name.
    pub name: String,
    /// Institution description.
    pub description: Option<String>,
    /// Shield logo file name.
    pub logo_name: Option<String>,
    /// Banner file name.
    pub banner_name: Option<String>,
    /// Authentication endpoint.
    pub auth_url: Option<String>,
    /// Whether the backing row is deleted.
    pub is_deleted: bool,
}

impl Institution {
    /// Build the projection from a backing project row.
    ///
    /// Returns `None` when the row does not carry an institution identity.
    pub fn from_project(project: &Project) -> Option<Self> {
        let id = project.institution_id.clone()?;
        Some(Self {
            id,
            project_id: project.id,
            name: project.title.clone(),
            description: project.description.clone(),
            logo_name: project.institution_logo_name.clone(),
            banner_name: project.institution_banner_name.clone(),
            auth_url: project.institution_auth_url.clone(),
            is_deleted: project.is_deleted,
        })
    }

    /// Static asset path of the institution's shield logo.
    pub fn logo_path(&self) -> Option<String> {
        self.logo_name
            .as_ref()
            .map(|name| format!("/static/img/institutions/shields/{name}"))
    }

    /// Static asset path of the institution's banner.
    pub fn banner_path(&self) -> Option<String> {
        self.banner_name
            .as_ref()
            .map(|name| format!("/static/img/institutions/banners/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project_row(institution_id: Option<&str>) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: "Example University".to_string(),
            description: None,
            parent_id: None,
            is_registration: false,
            is_deleted: false,
            preprint_file_id: None,
            is_preprint_orphan: false,
            institution_id: institution_id.map(String::from),
            institution_logo_name: Some("example.png".to_string()),
            institution_banner_name: None,
            institution_auth_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_projection_requires_institution_id() {
        assert!(Institution::from_project(&project_row(None)).is_none());

        let inst = Institution::from_project(&project_row(Some("exu"))).expect("projection");
        assert_eq!(inst.id, "exu");
        assert_eq!(inst.name, "Example University");
    }

    #[test]
    fn test_asset_paths() {
        let inst = Institution::from_project(&project_row(Some("exu"))).expect("projection");
        assert_eq!(
            inst.logo_path().as_deref(),
            Some("/static/img/institutions/shields/example.png")
        );
        assert_eq!(inst.banner_path(), None);
    }
}
