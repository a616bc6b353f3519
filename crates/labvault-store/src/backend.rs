//! Store traits implemented by all backends.
//!
//! Method names are unique across traits so a single backend type can
//! implement all of them without call-site ambiguity.

use async_trait::async_trait;
use uuid::Uuid;

use labvault_core::result::AppResult;
use labvault_entity::audit::{NewLogEntry, StorageLogEntry};
use labvault_entity::node::{CreateFileNode, FileNode, TrashedFileNode};
use labvault_entity::project::{Institution, Project};
use labvault_entity::settings::NodeSettings;
use labvault_entity::tag::Tag;
use labvault_entity::version::{FileVersion, NewFileVersion};

/// Tree storage for live and trashed file nodes.
///
/// Mutations that take a [`NewLogEntry`] write it in the same transaction
/// as the state change; neither is ever persisted without the other.
#[async_trait]
pub trait NodeStore: Send + Sync + 'static {
    /// Find a live node by ID.
    async fn get_node(&self, id: Uuid) -> AppResult<Option<FileNode>>;

    /// Find a live node by ID, scoped to a project.
    async fn get_node_in_project(&self, id: Uuid, project: Uuid) -> AppResult<Option<FileNode>>;

    /// Find a live child of `parent` by name.
    async fn child_by_name(&self, parent: Uuid, name: &str) -> AppResult<Option<FileNode>>;

    /// The root node of a project's tree, if one was materialized.
    async fn project_root(&self, project: Uuid) -> AppResult<Option<FileNode>>;

    /// List the live children of a folder, ordered by name.
    async fn children(&self, parent: Uuid) -> AppResult<Vec<FileNode>>;

    /// Insert a new live node.
    ///
    /// Fails with a conflict when a sibling of the same name exists, or
    /// when inserting a second root for the same project.
    async fn insert_node(&self, data: CreateFileNode) -> AppResult<FileNode>;

    /// Re-parent (and optionally rename) a node.
    async fn set_parent_and_name(
        &self,
        id: Uuid,
        new_parent: Uuid,
        new_name: Option<String>,
        log: NewLogEntry,
    ) -> AppResult<FileNode>;

    /// Update the checkout holder of a node.
    ///
    /// The update is guarded: it only applies while the node's current
    /// holder still equals `expected`, re-evaluated inside the same
    /// transaction as the write. A guard miss fails with a checked-out
    /// conflict so a concurrent checkout is never silently overwritten.
    async fn set_checkout(
        &self,
        id: Uuid,
        holder: Option<Uuid>,
        expected: Option<Uuid>,
        log: NewLogEntry,
    ) -> AppResult<FileNode>;

    /// Move a node and every descendant into the trash table.
    ///
    /// Trashed records keep their identifiers and parent linkage. Returns
    /// the trashed records with the requested node first; descendant order
    /// is unspecified.
    async fn trash_subtree(
        &self,
        id: Uuid,
        deleted_by: Option<Uuid>,
        log: NewLogEntry,
    ) -> AppResult<Vec<TrashedFileNode>>;

    /// Find a trashed node by ID.
    async fn get_trashed(&self, id: Uuid) -> AppResult<Option<TrashedFileNode>>;

    /// List the trashed children of a trashed folder, ordered by name.
    async fn trashed_children(&self, parent: Uuid) -> AppResult<Vec<TrashedFileNode>>;
}

/// Version history storage.
#[async_trait]
pub trait VersionStore: Send + Sync + 'static {
    /// All versions of a file, ascending by identifier.
    async fn versions_for(&self, file: Uuid) -> AppResult<Vec<FileVersion>>;

    /// Append a version to a file's history.
    ///
    /// Fails with a conflict when the identifier is already taken; the
    /// optional log entry is written in the same transaction.
    async fn append_version(
        &self,
        version: NewFileVersion,
        log: Option<NewLogEntry>,
    ) -> AppResult<FileVersion>;
}

/// File-to-tag association storage.
#[async_trait]
pub trait TagStore: Send + Sync + 'static {
    /// Tags attached to a file, in attachment order.
    async fn tags_for(&self, file: Uuid) -> AppResult<Vec<Tag>>;

    /// Attach a tag to a file. Idempotent per (file, label).
    async fn attach_tag(&self, file: Uuid, label: &str, log: Option<NewLogEntry>)
        -> AppResult<()>;

    /// Detach a tag from a file.
    async fn detach_tag(&self, file: Uuid, label: &str, log: Option<NewLogEntry>)
        -> AppResult<()>;
}

/// The platform-wide tag registry.
#[async_trait]
pub trait TagRegistry: Send + Sync + 'static {
    /// Find an existing tag by label.
    async fn find_tag(&self, label: &str) -> AppResult<Option<Tag>>;

    /// Find a tag by label, creating it when unknown.
    async fn find_or_create_tag(&self, label: &str) -> AppResult<Tag>;
}

/// Project storage, including the institution projection.
#[async_trait]
pub trait ProjectStore: Send + Sync + 'static {
    /// Find a project by ID.
    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>>;

    /// Flag a project whose preprint primary file was deleted.
    async fn mark_preprint_orphan(&self, id: Uuid) -> AppResult<()>;

    /// All non-deleted institution rows, projected.
    async fn institutions(&self) -> AppResult<Vec<Institution>>;

    /// Find a non-deleted institution by its short identifier.
    async fn find_institution(&self, institution_id: &str) -> AppResult<Option<Institution>>;
}

/// Per-project addon settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    /// The settings row for a project, if one exists.
    async fn settings_for_project(&self, project: Uuid) -> AppResult<Option<NodeSettings>>;

    /// Create the settings row for a project.
    async fn insert_settings(&self, project: Uuid) -> AppResult<NodeSettings>;

    /// Attach the root node to a settings row.
    async fn attach_root(&self, id: Uuid, root: Uuid) -> AppResult<NodeSettings>;
}

/// Project-level audit log storage.
#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// Append a standalone audit entry.
    async fn add_log(&self, entry: NewLogEntry) -> AppResult<StorageLogEntry>;

    /// All audit entries for a project, oldest first.
    async fn logs_for_project(&self, project: Uuid) -> AppResult<Vec<StorageLogEntry>>;
}
