//! Tag management rules (files only).

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_entity::audit::{LogAction, NewLogEntry};
use labvault_entity::node::{FileNode, NodeKind};
use labvault_entity::project::Project;
use labvault_store::backend::{NodeStore, ProjectStore, TagRegistry, TagStore};

use crate::context::Auth;
use crate::path;

/// Attaches and detaches tags on files.
///
/// Tags are frozen once the owning project becomes a registration
/// snapshot: additions degrade to no-ops, removals fail loudly.
#[derive(Clone)]
pub struct TagService {
    /// Node store.
    nodes: Arc<dyn NodeStore>,
    /// File-tag association store.
    tags: Arc<dyn TagStore>,
    /// Tag registry.
    registry: Arc<dyn TagRegistry>,
    /// Project store.
    projects: Arc<dyn ProjectStore>,
}

impl TagService {
    /// Creates a new tag service.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        tags: Arc<dyn TagStore>,
        registry: Arc<dyn TagRegistry>,
        projects: Arc<dyn ProjectStore>,
    ) -> Self {
        Self {
            nodes,
            tags,
            registry,
            projects,
        }
    }

    /// Attaches a tag to a file.
    ///
    /// Returns `false` without mutating when the tag is already present or
    /// the project is a registration; otherwise finds or creates the tag,
    /// attaches it, optionally logs, and returns `true`.
    pub async fn add_tag(
        &self,
        auth: &Auth,
        file_id: Uuid,
        label: &str,
        log: bool,
    ) -> AppResult<bool> {
        let node = self.file_node(file_id).await?;
        let project = self.project_of(&node).await?;

        let current = self.tags.tags_for(file_id).await?;
        if current.iter().any(|tag| tag.label == label) || project.is_registration {
            return Ok(false);
        }

        self.registry.find_or_create_tag(label).await?;
        let entry = if log {
            Some(self.tag_log(&node, &project, LogAction::TagAdded, label, auth).await?)
        } else {
            None
        };
        self.tags.attach_tag(file_id, label, entry).await?;

        info!(user_id = %auth.user_id, file_id = %file_id, tag = label, "Tag added");
        Ok(true)
    }

    /// Detaches a tag from a file.
    ///
    /// Fails with an immutable-snapshot error on registrations regardless
    /// of tag presence, an invalid-tag error when the registry does not
    /// know the label, and a tag-not-found error when the file does not
    /// carry it.
    pub async fn remove_tag(
        &self,
        auth: &Auth,
        file_id: Uuid,
        label: &str,
        log: bool,
    ) -> AppResult<()> {
        let node = self.file_node(file_id).await?;
        let project = self.project_of(&node).await?;
        if project.is_registration {
            return Err(AppError::immutable_snapshot(format!(
                "Project {} is a registration; its tags cannot be edited",
                project.id
            )));
        }

        if self.registry.find_tag(label).await?.is_none() {
            return Err(AppError::invalid_tag(format!("Unknown tag '{label}'")));
        }

        let entry = if log {
            Some(self.tag_log(&node, &project, LogAction::TagRemoved, label, auth).await?)
        } else {
            None
        };
        self.tags.detach_tag(file_id, label, entry).await?;

        info!(user_id = %auth.user_id, file_id = %file_id, tag = label, "Tag removed");
        Ok(())
    }

    async fn tag_log(
        &self,
        node: &FileNode,
        project: &Project,
        action: LogAction,
        label: &str,
        auth: &Auth,
    ) -> AppResult<NewLogEntry> {
        let materialized = path::materialized_path(self.nodes.as_ref(), node).await?;
        Ok(NewLogEntry::new(
            project.id,
            action,
            json!({
                "parent_node": project.parent_id,
                "node": project.id,
                "path": materialized,
                "tag": label,
            }),
            auth.user_id,
        ))
    }

    async fn file_node(&self, file_id: Uuid) -> AppResult<FileNode> {
        let node = self
            .nodes
            .get_node(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        if node.kind != NodeKind::File {
            return Err(AppError::validation(format!(
                "Node {file_id} is a folder; only files carry tags"
            )));
        }
        Ok(node)
    }

    async fn project_of(&self, node: &FileNode) -> AppResult<Project> {
        self.projects
            .get_project(node.project_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Project {} not found", node.project_id)))
    }
}
