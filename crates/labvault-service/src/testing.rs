//! Shared test harness over the in-memory backend.

use std::sync::Arc;

use uuid::Uuid;

use labvault_core::types::permission::PermissionLevel;
use labvault_entity::node::{CreateFileNode, FileNode, NodeKind};
use labvault_entity::project::Project;
use labvault_store::backend::NodeStore;
use labvault_store::memory::MemoryBackend;

use crate::checkout::CheckoutService;
use crate::context::Auth;
use crate::node::NodeService;
use crate::settings::SettingsService;
use crate::tags::TagService;
use crate::trash::TrashService;
use crate::version::VersionService;

/// One project with a materialized root, backed by a fresh in-memory
/// backend that also plays every collaborator role.
pub(crate) struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub project: Project,
    pub root: FileNode,
}

impl Harness {
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let project = backend.seed_project("demo project");
        let root = backend
            .insert_node(CreateFileNode {
                name: String::new(),
                parent_id: None,
                project_id: project.id,
                kind: NodeKind::Folder,
            })
            .await
            .expect("root");
        Self {
            backend,
            project,
            root,
        }
    }

    pub async fn folder(&self, parent: Uuid, name: &str) -> FileNode {
        self.backend
            .insert_node(CreateFileNode {
                name: name.to_string(),
                parent_id: Some(parent),
                project_id: self.project.id,
                kind: NodeKind::Folder,
            })
            .await
            .expect("folder")
    }

    pub async fn file(&self, parent: Uuid, name: &str) -> FileNode {
        self.backend
            .insert_node(CreateFileNode {
                name: name.to_string(),
                parent_id: Some(parent),
                project_id: self.project.id,
                kind: NodeKind::File,
            })
            .await
            .expect("file")
    }

    /// A fresh user holding write permission on the harness project.
    pub async fn writer(&self) -> Auth {
        let user = Uuid::new_v4();
        self.backend
            .grant(user, self.project.id, PermissionLevel::Write);
        Auth::new(user)
    }

    /// A fresh user holding only read permission.
    pub async fn reader(&self) -> Auth {
        let user = Uuid::new_v4();
        self.backend
            .grant(user, self.project.id, PermissionLevel::Read);
        Auth::new(user)
    }

    /// A fresh user holding admin (and write) permission.
    pub async fn admin(&self) -> Auth {
        let user = Uuid::new_v4();
        self.backend
            .grant(user, self.project.id, PermissionLevel::Admin);
        Auth::new(user)
    }

    pub fn checkout_service(&self) -> CheckoutService {
        CheckoutService::new(
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
        )
    }

    pub fn node_service(&self) -> NodeService {
        NodeService::new(self.backend.clone(), self.backend.clone())
    }

    pub fn version_service(&self) -> VersionService {
        VersionService::new(
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
        )
    }

    pub fn tag_service(&self) -> TagService {
        TagService::new(
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
        )
    }

    pub fn trash_service(&self) -> TrashService {
        TrashService::new(
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
        )
    }

    pub fn settings_service(&self) -> SettingsService {
        SettingsService::new(
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
        )
    }
}
