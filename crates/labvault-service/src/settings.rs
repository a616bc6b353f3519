//! Node-settings lifecycle: lazy root creation and fork/registration
//! cloning.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_entity::node::{CreateFileNode, FileNode, NodeKind};
use labvault_entity::settings::NodeSettings;
use labvault_entity::version::NewFileVersion;
use labvault_store::backend::{NodeStore, SettingsStore, TagStore, VersionStore};

/// Manages per-project storage settings and their lifecycle hooks.
#[derive(Clone)]
pub struct SettingsService {
    /// Settings store.
    settings: Arc<dyn SettingsStore>,
    /// Node store.
    nodes: Arc<dyn NodeStore>,
    /// Version store (fork deep copy).
    versions: Arc<dyn VersionStore>,
    /// File-tag association store (fork deep copy).
    tags: Arc<dyn TagStore>,
}

impl SettingsService {
    /// Creates a new settings service.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        nodes: Arc<dyn NodeStore>,
        versions: Arc<dyn VersionStore>,
        tags: Arc<dyn TagStore>,
    ) -> Self {
        Self {
            settings,
            nodes,
            versions,
            tags,
        }
    }

    /// Ensures a project has settings with an attached root folder.
    ///
    /// Idempotent: an already-complete settings row is returned untouched.
    /// The settings row is persisted before the root so the root reference
    /// has something to attach to, and the root is always named with the
    /// empty string.
    pub async fn on_add(&self, project: Uuid) -> AppResult<NodeSettings> {
        let existing = self.settings.settings_for_project(project).await?;
        if let Some(settings) = &existing {
            if settings.root_node_id.is_some() {
                return Ok(settings.clone());
            }
        }

        let settings = match existing {
            Some(settings) => settings,
            None => self.settings.insert_settings(project).await?,
        };

        // Recover an already-materialized but unattached root rather than
        // trying to insert a second one.
        let root = match self.nodes.project_root(project).await? {
            Some(root) => root,
            None => {
                self.nodes
                    .insert_node(CreateFileNode {
                        name: String::new(),
                        parent_id: None,
                        project_id: project,
                        kind: NodeKind::Folder,
                    })
                    .await?
            }
        };
        let settings = self.settings.attach_root(settings.id, root.id).await?;

        info!(project_id = %project, root_id = %root.id, "Storage root attached");
        Ok(settings)
    }

    /// The root folder of a project's tree, materializing settings and root
    /// on first access.
    pub async fn get_root(&self, project: Uuid) -> AppResult<FileNode> {
        let settings = self.on_add(project).await?;
        let root_id = settings
            .root_node_id
            .ok_or_else(|| AppError::internal("Settings left without a root"))?;
        self.nodes
            .get_node(root_id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Root node {root_id} is missing")))
    }

    /// Clones the settings onto a fork, deep-copying the entire file tree
    /// (folders, files, version history, tag attachments) into the fork's
    /// namespace.
    pub async fn after_fork(&self, project: Uuid, fork: Uuid) -> AppResult<NodeSettings> {
        let source_root = self.get_root(project).await?;
        let clone = self.settings.insert_settings(fork).await?;

        let new_root = self
            .nodes
            .insert_node(CreateFileNode {
                name: String::new(),
                parent_id: None,
                project_id: fork,
                kind: NodeKind::Folder,
            })
            .await?;

        let mut copied = 0usize;
        let mut stack = vec![(source_root.id, new_root.id)];
        while let Some((source_id, target_id)) = stack.pop() {
            for child in self.nodes.children(source_id).await? {
                let copy = self
                    .nodes
                    .insert_node(CreateFileNode {
                        name: child.name.clone(),
                        parent_id: Some(target_id),
                        project_id: fork,
                        kind: child.kind,
                    })
                    .await?;
                copied += 1;
                match child.kind {
                    NodeKind::Folder => stack.push((child.id, copy.id)),
                    NodeKind::File => self.copy_file_contents(&child, &copy).await?,
                }
            }
        }

        let clone = self.settings.attach_root(clone.id, new_root.id).await?;
        info!(
            project_id = %project,
            fork_id = %fork,
            copied,
            "Storage tree copied to fork"
        );
        Ok(clone)
    }

    /// Clones the settings onto a registration with a fresh empty root.
    ///
    /// Registrations do not duplicate file content at this layer;
    /// copy-on-register is handled by the broader system.
    pub async fn after_register(&self, registration: Uuid) -> AppResult<NodeSettings> {
        self.on_add(registration).await
    }

    /// Copies version history and tag attachments from one file to another.
    async fn copy_file_contents(&self, source: &FileNode, target: &FileNode) -> AppResult<()> {
        for version in self.versions.versions_for(source.id).await? {
            self.versions
                .append_version(
                    NewFileVersion {
                        file_id: target.id,
                        identifier: version.identifier,
                        creator_id: version.creator_id,
                        location: version.location,
                        metadata: version.metadata,
                        size: version.size,
                    },
                    None,
                )
                .await?;
        }
        for tag in self.tags.tags_for(source.id).await? {
            self.tags.attach_tag(target.id, &tag.label, None).await?;
        }
        Ok(())
    }
}
