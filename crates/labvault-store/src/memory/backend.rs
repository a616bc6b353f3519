//! In-memory backend implementation.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_core::traits::{ArchiveRegistry, IdentifierRegistry, PermissionOracle, SearchIndex};
use labvault_core::types::permission::PermissionLevel;
use labvault_entity::audit::{NewLogEntry, StorageLogEntry};
use labvault_entity::node::{CreateFileNode, FileNode, TrashedFileNode};
use labvault_entity::project::{Institution, Project};
use labvault_entity::settings::NodeSettings;
use labvault_entity::tag::Tag;
use labvault_entity::version::{FileVersion, NewFileVersion};

use crate::backend::{
    LogStore, NodeStore, ProjectStore, SettingsStore, TagRegistry, TagStore, VersionStore,
};

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<Uuid, FileNode>,
    trashed: HashMap<Uuid, TrashedFileNode>,
    versions: HashMap<Uuid, Vec<FileVersion>>,
    tags: HashMap<String, Tag>,
    file_tags: HashMap<Uuid, Vec<String>>,
    projects: HashMap<Uuid, Project>,
    settings: HashMap<Uuid, NodeSettings>,
    logs: Vec<StorageLogEntry>,
    permissions: HashMap<(Uuid, Uuid), HashSet<PermissionLevel>>,
    guids: HashMap<Uuid, Vec<String>>,
    indexed: HashSet<Uuid>,
    archives: HashMap<String, serde_json::Value>,
}

impl State {
    fn push_log(&mut self, entry: NewLogEntry) -> StorageLogEntry {
        let stored = StorageLogEntry {
            id: Uuid::new_v4(),
            project_id: entry.project_id,
            action: entry.action,
            params: entry.params,
            actor_id: entry.actor_id,
            created_at: Utc::now(),
        };
        self.logs.push(stored.clone());
        stored
    }

    /// Ids of `root` and every live descendant, pre-order.
    fn subtree_ids(&self, root: Uuid) -> Vec<Uuid> {
        let mut collected = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            collected.push(id);
            let mut children: Vec<&FileNode> = self
                .nodes
                .values()
                .filter(|n| n.parent_id == Some(id))
                .collect();
            children.sort_by(|a, b| a.name.cmp(&b.name));
            // reversed so the stack pops children in name order
            stack.extend(children.iter().rev().map(|n| n.id));
        }
        collected
    }
}

/// A complete in-memory backend.
///
/// One `RwLock` over the whole state stands in for the database's
/// per-transaction isolation: every mutating operation holds the write
/// lock for its full duration, so a state change and its audit entry are
/// indivisible and checkout guards cannot race.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().expect("state lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().expect("state lock poisoned")
    }

    // -- Seeding helpers (projects and collaborator state are owned by
    //    other subsystems in production; tests and embedders plant them
    //    here directly) --

    /// Insert a project row as-is.
    pub fn insert_project(&self, project: Project) {
        self.write().projects.insert(project.id, project);
    }

    /// Create and insert a plain project.
    pub fn seed_project(&self, title: &str) -> Project {
        let project = Self::blank_project(title);
        self.insert_project(project.clone());
        project
    }

    /// Create and insert a registration snapshot project.
    pub fn seed_registration(&self, title: &str) -> Project {
        let mut project = Self::blank_project(title);
        project.is_registration = true;
        self.insert_project(project.clone());
        project
    }

    /// Create and insert an institution-backing project row.
    pub fn seed_institution(&self, institution_id: &str, name: &str) -> Project {
        let mut project = Self::blank_project(name);
        project.institution_id = Some(institution_id.to_string());
        self.insert_project(project.clone());
        project
    }

    /// Designate a file as a project's preprint primary file.
    pub fn set_preprint_file(&self, project: Uuid, file: Uuid) {
        if let Some(row) = self.write().projects.get_mut(&project) {
            row.preprint_file_id = Some(file);
        }
    }

    /// Grant a permission level to a user on a project.
    pub fn grant(&self, user: Uuid, project: Uuid, level: PermissionLevel) {
        self.write()
            .permissions
            .entry((user, project))
            .or_default()
            .insert(level);
    }

    /// Assign an external identifier to a referent.
    pub fn assign_guid(&self, referent: Uuid, guid: &str) {
        self.write()
            .guids
            .entry(referent)
            .or_default()
            .push(guid.to_string());
    }

    /// Whether a file is currently present in the search index.
    pub fn is_indexed(&self, file: Uuid) -> bool {
        self.read().indexed.contains(&file)
    }

    /// Register archive metadata for a storage object.
    pub fn set_archive(&self, location_object: &str, metadata: serde_json::Value) {
        self.write()
            .archives
            .insert(location_object.to_string(), metadata);
    }

    /// Build a default project row without inserting it.
    pub fn blank_project(title: &str) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            parent_id: None,
            is_registration: false,
            is_deleted: false,
            preprint_file_id: None,
            is_preprint_orphan: false,
            institution_id: None,
            institution_logo_name: None,
            institution_banner_name: None,
            institution_auth_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl NodeStore for MemoryBackend {
    async fn get_node(&self, id: Uuid) -> AppResult<Option<FileNode>> {
        Ok(self.read().nodes.get(&id).cloned())
    }

    async fn get_node_in_project(&self, id: Uuid, project: Uuid) -> AppResult<Option<FileNode>> {
        Ok(self
            .read()
            .nodes
            .get(&id)
            .filter(|n| n.project_id == project)
            .cloned())
    }

    async fn child_by_name(&self, parent: Uuid, name: &str) -> AppResult<Option<FileNode>> {
        Ok(self
            .read()
            .nodes
            .values()
            .find(|n| n.parent_id == Some(parent) && n.name == name)
            .cloned())
    }

    async fn project_root(&self, project: Uuid) -> AppResult<Option<FileNode>> {
        Ok(self
            .read()
            .nodes
            .values()
            .find(|n| n.parent_id.is_none() && n.project_id == project)
            .cloned())
    }

    async fn children(&self, parent: Uuid) -> AppResult<Vec<FileNode>> {
        let state = self.read();
        let mut children: Vec<FileNode> = state
            .nodes
            .values()
            .filter(|n| n.parent_id == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn insert_node(&self, data: CreateFileNode) -> AppResult<FileNode> {
        let mut state = self.write();
        match data.parent_id {
            Some(parent) => {
                if state
                    .nodes
                    .values()
                    .any(|n| n.parent_id == Some(parent) && n.name == data.name)
                {
                    return Err(AppError::conflict(format!(
                        "Node '{}' already exists under parent {parent}",
                        data.name
                    )));
                }
            }
            None => {
                if state
                    .nodes
                    .values()
                    .any(|n| n.parent_id.is_none() && n.project_id == data.project_id)
                {
                    return Err(AppError::conflict(format!(
                        "Project {} already has a root node",
                        data.project_id
                    )));
                }
            }
        }

        let now = Utc::now();
        let node = FileNode {
            id: Uuid::new_v4(),
            name: data.name,
            parent_id: data.parent_id,
            project_id: data.project_id,
            kind: data.kind,
            checkout_user_id: None,
            created_at: now,
            updated_at: now,
        };
        state.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    async fn set_parent_and_name(
        &self,
        id: Uuid,
        new_parent: Uuid,
        new_name: Option<String>,
        log: NewLogEntry,
    ) -> AppResult<FileNode> {
        let mut state = self.write();
        let name = match &new_name {
            Some(name) => name.clone(),
            None => state
                .nodes
                .get(&id)
                .map(|n| n.name.clone())
                .unwrap_or_default(),
        };
        if state
            .nodes
            .values()
            .any(|n| n.id != id && n.parent_id == Some(new_parent) && n.name == name)
        {
            return Err(AppError::conflict(format!(
                "Node '{name}' already exists under parent {new_parent}"
            )));
        }

        let node = state
            .nodes
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?;
        node.parent_id = Some(new_parent);
        node.name = name;
        node.updated_at = Utc::now();
        let updated = node.clone();
        state.push_log(log);
        Ok(updated)
    }

    async fn set_checkout(
        &self,
        id: Uuid,
        holder: Option<Uuid>,
        expected: Option<Uuid>,
        log: NewLogEntry,
    ) -> AppResult<FileNode> {
        let mut state = self.write();
        let node = state
            .nodes
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?;
        if node.checkout_user_id != expected {
            return Err(AppError::checked_out(format!(
                "Node {id} checkout changed concurrently (held by {:?})",
                node.checkout_user_id
            )));
        }
        node.checkout_user_id = holder;
        node.updated_at = Utc::now();
        let updated = node.clone();
        state.push_log(log);
        Ok(updated)
    }

    async fn trash_subtree(
        &self,
        id: Uuid,
        deleted_by: Option<Uuid>,
        log: NewLogEntry,
    ) -> AppResult<Vec<TrashedFileNode>> {
        let mut state = self.write();
        if !state.nodes.contains_key(&id) {
            return Err(AppError::not_found(format!("Node {id} not found")));
        }

        let ids = state.subtree_ids(id);
        let deleted_at = Utc::now();
        let mut trashed = Vec::with_capacity(ids.len());
        for node_id in ids {
            let node = state
                .nodes
                .remove(&node_id)
                .ok_or_else(|| AppError::internal(format!("Node {node_id} vanished mid-trash")))?;
            let record = TrashedFileNode {
                id: node.id,
                name: node.name,
                parent_id: node.parent_id,
                project_id: node.project_id,
                kind: node.kind,
                deleted_by,
                deleted_at,
            };
            state.trashed.insert(record.id, record.clone());
            trashed.push(record);
        }
        state.push_log(log);
        debug!(node_id = %id, count = trashed.len(), "Trashed subtree");
        Ok(trashed)
    }

    async fn get_trashed(&self, id: Uuid) -> AppResult<Option<TrashedFileNode>> {
        Ok(self.read().trashed.get(&id).cloned())
    }

    async fn trashed_children(&self, parent: Uuid) -> AppResult<Vec<TrashedFileNode>> {
        let state = self.read();
        let mut children: Vec<TrashedFileNode> = state
            .trashed
            .values()
            .filter(|n| n.parent_id == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

#[async_trait]
impl VersionStore for MemoryBackend {
    async fn versions_for(&self, file: Uuid) -> AppResult<Vec<FileVersion>> {
        Ok(self.read().versions.get(&file).cloned().unwrap_or_default())
    }

    async fn append_version(
        &self,
        version: NewFileVersion,
        log: Option<NewLogEntry>,
    ) -> AppResult<FileVersion> {
        let mut state = self.write();
        let history = state.versions.entry(version.file_id).or_default();
        if history.iter().any(|v| v.identifier == version.identifier) {
            return Err(AppError::conflict(format!(
                "Version {} already exists for file {}",
                version.identifier, version.file_id
            )));
        }
        let stored = FileVersion {
            id: Uuid::new_v4(),
            file_id: version.file_id,
            identifier: version.identifier,
            creator_id: version.creator_id,
            location: version.location,
            metadata: version.metadata,
            size: version.size,
            created_at: Utc::now(),
        };
        history.push(stored.clone());
        history.sort_by_key(|v| v.identifier);
        if let Some(log) = log {
            state.push_log(log);
        }
        Ok(stored)
    }
}

#[async_trait]
impl TagStore for MemoryBackend {
    async fn tags_for(&self, file: Uuid) -> AppResult<Vec<Tag>> {
        let state = self.read();
        let labels = state.file_tags.get(&file).cloned().unwrap_or_default();
        Ok(labels
            .iter()
            .filter_map(|label| state.tags.get(label).cloned())
            .collect())
    }

    async fn attach_tag(&self, file: Uuid, label: &str, log: Option<NewLogEntry>) -> AppResult<()> {
        let mut state = self.write();
        let labels = state.file_tags.entry(file).or_default();
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
        if let Some(log) = log {
            state.push_log(log);
        }
        Ok(())
    }

    async fn detach_tag(&self, file: Uuid, label: &str, log: Option<NewLogEntry>) -> AppResult<()> {
        let mut state = self.write();
        let labels = state.file_tags.entry(file).or_default();
        let before = labels.len();
        labels.retain(|l| l != label);
        if labels.len() == before {
            return Err(AppError::tag_not_found(format!(
                "File {file} does not carry tag '{label}'"
            )));
        }
        if let Some(log) = log {
            state.push_log(log);
        }
        Ok(())
    }
}

#[async_trait]
impl TagRegistry for MemoryBackend {
    async fn find_tag(&self, label: &str) -> AppResult<Option<Tag>> {
        Ok(self.read().tags.get(label).cloned())
    }

    async fn find_or_create_tag(&self, label: &str) -> AppResult<Tag> {
        let mut state = self.write();
        if let Some(tag) = state.tags.get(label) {
            return Ok(tag.clone());
        }
        let tag = Tag::new(label);
        state.tags.insert(label.to_string(), tag.clone());
        Ok(tag)
    }
}

#[async_trait]
impl ProjectStore for MemoryBackend {
    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        Ok(self.read().projects.get(&id).cloned())
    }

    async fn mark_preprint_orphan(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.write();
        let project = state
            .projects
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Project {id} not found")))?;
        project.is_preprint_orphan = true;
        project.updated_at = Utc::now();
        Ok(())
    }

    async fn institutions(&self) -> AppResult<Vec<Institution>> {
        let state = self.read();
        let mut institutions: Vec<Institution> = state
            .projects
            .values()
            .filter(|p| !p.is_deleted)
            .filter_map(Institution::from_project)
            .collect();
        institutions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(institutions)
    }

    async fn find_institution(&self, institution_id: &str) -> AppResult<Option<Institution>> {
        let state = self.read();
        Ok(state
            .projects
            .values()
            .filter(|p| !p.is_deleted)
            .filter(|p| p.institution_id.as_deref() == Some(institution_id))
            .find_map(Institution::from_project))
    }
}

#[async_trait]
impl SettingsStore for MemoryBackend {
    async fn settings_for_project(&self, project: Uuid) -> AppResult<Option<NodeSettings>> {
        Ok(self.read().settings.get(&project).cloned())
    }

    async fn insert_settings(&self, project: Uuid) -> AppResult<NodeSettings> {
        let mut state = self.write();
        if state.settings.contains_key(&project) {
            return Err(AppError::conflict(format!(
                "Project {project} already has storage settings"
            )));
        }
        let settings = NodeSettings {
            id: Uuid::new_v4(),
            project_id: project,
            root_node_id: None,
            created_at: Utc::now(),
        };
        state.settings.insert(project, settings.clone());
        Ok(settings)
    }

    async fn attach_root(&self, id: Uuid, root: Uuid) -> AppResult<NodeSettings> {
        let mut state = self.write();
        let settings = state
            .settings
            .values_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::not_found(format!("Settings {id} not found")))?;
        settings.root_node_id = Some(root);
        Ok(settings.clone())
    }
}

#[async_trait]
impl LogStore for MemoryBackend {
    async fn add_log(&self, entry: NewLogEntry) -> AppResult<StorageLogEntry> {
        Ok(self.write().push_log(entry))
    }

    async fn logs_for_project(&self, project: Uuid) -> AppResult<Vec<StorageLogEntry>> {
        Ok(self
            .read()
            .logs
            .iter()
            .filter(|l| l.project_id == project)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PermissionOracle for MemoryBackend {
    async fn permissions_of(
        &self,
        user: Uuid,
        project: Uuid,
    ) -> AppResult<HashSet<PermissionLevel>> {
        Ok(self
            .read()
            .permissions
            .get(&(user, project))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl IdentifierRegistry for MemoryBackend {
    async fn resolve(&self, referent: Uuid) -> AppResult<Option<String>> {
        Ok(self
            .read()
            .guids
            .get(&referent)
            .and_then(|ids| ids.first().cloned()))
    }

    async fn ids_for(&self, referent: Uuid) -> AppResult<Vec<String>> {
        Ok(self.read().guids.get(&referent).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SearchIndex for MemoryBackend {
    async fn index_file(&self, file: Uuid) -> AppResult<()> {
        self.write().indexed.insert(file);
        Ok(())
    }

    async fn remove_file(&self, file: Uuid) -> AppResult<()> {
        self.write().indexed.remove(&file);
        Ok(())
    }
}

#[async_trait]
impl ArchiveRegistry for MemoryBackend {
    async fn find_matching(
        &self,
        location_object: &str,
    ) -> AppResult<Option<serde_json::Value>> {
        Ok(self.read().archives.get(location_object).cloned())
    }
}
