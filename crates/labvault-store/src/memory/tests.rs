//! In-memory backend tests.

use serde_json::json;
use uuid::Uuid;

use labvault_core::error::ErrorKind;
use labvault_entity::audit::{LogAction, NewLogEntry};
use labvault_entity::node::{CreateFileNode, NodeKind};
use labvault_entity::version::{NewFileVersion, VersionLocation};

use crate::backend::{
    LogStore, NodeStore, ProjectStore, SettingsStore, TagRegistry, TagStore, VersionStore,
};
use crate::memory::MemoryBackend;

fn log_entry(project: Uuid, action: LogAction) -> NewLogEntry {
    NewLogEntry::new(project, action, json!({}), Uuid::new_v4())
}

async fn seed_tree(backend: &MemoryBackend) -> (Uuid, Uuid, Uuid) {
    let project = backend.seed_project("demo").id;
    let root = backend
        .insert_node(CreateFileNode {
            name: String::new(),
            parent_id: None,
            project_id: project,
            kind: NodeKind::Folder,
        })
        .await
        .expect("root");
    let file = backend
        .insert_node(CreateFileNode {
            name: "data.csv".to_string(),
            parent_id: Some(root.id),
            project_id: project,
            kind: NodeKind::File,
        })
        .await
        .expect("file");
    (project, root.id, file.id)
}

#[tokio::test]
async fn test_insert_rejects_duplicate_sibling() {
    let backend = MemoryBackend::new();
    let (project, root, _) = seed_tree(&backend).await;

    let err = backend
        .insert_node(CreateFileNode {
            name: "data.csv".to_string(),
            parent_id: Some(root),
            project_id: project,
            kind: NodeKind::File,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_insert_rejects_second_root() {
    let backend = MemoryBackend::new();
    let (project, _, _) = seed_tree(&backend).await;

    let err = backend
        .insert_node(CreateFileNode {
            name: String::new(),
            parent_id: None,
            project_id: project,
            kind: NodeKind::Folder,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_checkout_guard_detects_concurrent_change() {
    let backend = MemoryBackend::new();
    let (project, _, file) = seed_tree(&backend).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    backend
        .set_checkout(
            file,
            Some(alice),
            None,
            log_entry(project, LogAction::CheckedOut),
        )
        .await
        .expect("first checkout");

    // Bob read the node while it was free; his guarded write must fail.
    let err = backend
        .set_checkout(
            file,
            Some(bob),
            None,
            log_entry(project, LogAction::CheckedOut),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CheckedOut);

    // The failed attempt must not have produced an audit entry.
    let logs = backend.logs_for_project(project).await.expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, LogAction::CheckedOut);
}

#[tokio::test]
async fn test_trash_subtree_preserves_linkage() {
    let backend = MemoryBackend::new();
    let (project, root, _) = seed_tree(&backend).await;
    let folder = backend
        .insert_node(CreateFileNode {
            name: "results".to_string(),
            parent_id: Some(root),
            project_id: project,
            kind: NodeKind::Folder,
        })
        .await
        .expect("folder");
    let nested = backend
        .insert_node(CreateFileNode {
            name: "plot.png".to_string(),
            parent_id: Some(folder.id),
            project_id: project,
            kind: NodeKind::File,
        })
        .await
        .expect("nested");

    let trashed = backend
        .trash_subtree(folder.id, None, log_entry(project, LogAction::FileRemoved))
        .await
        .expect("trash");
    assert_eq!(trashed.len(), 2);
    assert_eq!(trashed[0].id, folder.id);

    assert!(backend.get_node(folder.id).await.expect("get").is_none());
    let record = backend
        .get_trashed(nested.id)
        .await
        .expect("get trashed")
        .expect("record");
    assert_eq!(record.parent_id, Some(folder.id));

    let children = backend.trashed_children(folder.id).await.expect("children");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, nested.id);
}

#[tokio::test]
async fn test_append_rejects_duplicate_identifier() {
    let backend = MemoryBackend::new();
    let (_, _, file) = seed_tree(&backend).await;
    let creator = Uuid::new_v4();

    backend
        .append_version(
            NewFileVersion::new(file, 1, creator, VersionLocation::new("filesystem", "a")),
            None,
        )
        .await
        .expect("first");
    let err = backend
        .append_version(
            NewFileVersion::new(file, 1, creator, VersionLocation::new("filesystem", "b")),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let versions = backend.versions_for(file).await.expect("versions");
    assert_eq!(versions.len(), 1);
}

#[tokio::test]
async fn test_tags_keep_attachment_order() {
    let backend = MemoryBackend::new();
    let (_, _, file) = seed_tree(&backend).await;

    for label in ["neuroscience", "fmri", "pilot"] {
        backend.find_or_create_tag(label).await.expect("registry");
        backend.attach_tag(file, label, None).await.expect("attach");
    }
    backend.detach_tag(file, "fmri", None).await.expect("detach");

    let labels: Vec<String> = backend
        .tags_for(file)
        .await
        .expect("tags")
        .into_iter()
        .map(|t| t.label)
        .collect();
    assert_eq!(labels, vec!["neuroscience", "pilot"]);

    let err = backend.detach_tag(file, "fmri", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TagNotFound);
}

#[tokio::test]
async fn test_settings_lifecycle() {
    let backend = MemoryBackend::new();
    let project = backend.seed_project("demo").id;

    let settings = backend.insert_settings(project).await.expect("insert");
    assert!(settings.root_node_id.is_none());

    let err = backend.insert_settings(project).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let root = Uuid::new_v4();
    let updated = backend
        .attach_root(settings.id, root)
        .await
        .expect("set root");
    assert_eq!(updated.root_node_id, Some(root));
}

#[tokio::test]
async fn test_institution_projection_filters() {
    let backend = MemoryBackend::new();
    backend.seed_project("plain project");
    backend.seed_institution("exu", "Example University");
    let mut deleted = MemoryBackend::blank_project("Gone University");
    deleted.institution_id = Some("gone".to_string());
    deleted.is_deleted = true;
    backend.insert_project(deleted);

    let institutions = backend.institutions().await.expect("institutions");
    assert_eq!(institutions.len(), 1);
    assert_eq!(institutions[0].id, "exu");

    assert!(
        backend
            .find_institution("gone")
            .await
            .expect("lookup")
            .is_none()
    );
}
