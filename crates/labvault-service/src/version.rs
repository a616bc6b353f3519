//! Version creation and lookup rules.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_core::traits::{ArchiveRegistry, SearchIndex};
use labvault_entity::audit::{LogAction, NewLogEntry};
use labvault_entity::node::{FileNode, NodeKind};
use labvault_entity::version::{FileVersion, NewFileVersion, VersionLocation};
use labvault_store::backend::{NodeStore, VersionStore};

use crate::context::Auth;
use crate::path;

/// Manages file version history.
#[derive(Clone)]
pub struct VersionService {
    /// Node store.
    nodes: Arc<dyn NodeStore>,
    /// Version store.
    versions: Arc<dyn VersionStore>,
    /// Archive registry for best-effort metadata enrichment.
    archive: Arc<dyn ArchiveRegistry>,
    /// Search index sink.
    search: Arc<dyn SearchIndex>,
}

impl VersionService {
    /// Creates a new version service.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        versions: Arc<dyn VersionStore>,
        archive: Arc<dyn ArchiveRegistry>,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            nodes,
            versions,
            archive,
            search,
        }
    }

    /// Appends a version to a file's history.
    ///
    /// The new version's identifier is the current count plus one. When the
    /// latest version already stores the same object (location-descriptor
    /// equality), the existing version is returned and nothing is
    /// persisted. Otherwise the provided metadata is applied once, a
    /// best-effort archive match may enrich it, and the version is appended
    /// and the file re-submitted to the search index.
    pub async fn create_version(
        &self,
        auth: &Auth,
        file_id: Uuid,
        location: VersionLocation,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<FileVersion> {
        let node = self.file_node(file_id).await?;
        let history = self.versions.versions_for(file_id).await?;

        if let Some(latest) = history.last() {
            if latest.location.is_duplicate_of(&location) {
                debug!(
                    file_id = %file_id,
                    identifier = latest.identifier,
                    "Duplicate location, returning existing version"
                );
                return Ok(latest.clone());
            }
        }

        let identifier = i32::try_from(history.len() + 1)
            .map_err(|_| AppError::internal("Version history overflow"))?;
        let mut version = NewFileVersion::new(file_id, identifier, auth.user_id, location);
        if let Some(metadata) = metadata {
            version.update_metadata(metadata);
        }

        // Best-effort: a miss or registry failure never blocks the upload.
        match self.archive.find_matching(&version.location.object).await {
            Ok(Some(archive_metadata)) => version.update_metadata(&archive_metadata),
            Ok(None) => {}
            Err(err) => {
                debug!(file_id = %file_id, error = %err, "Archive registry lookup failed")
            }
        }

        let log = if identifier == 1 {
            let materialized = path::materialized_path(self.nodes.as_ref(), &node).await?;
            Some(NewLogEntry::new(
                node.project_id,
                LogAction::FileCreated,
                json!({"node": node.id, "path": materialized}),
                auth.user_id,
            ))
        } else {
            None
        };

        let stored = self.versions.append_version(version, log).await?;
        self.search.index_file(file_id).await?;

        info!(
            user_id = %auth.user_id,
            file_id = %file_id,
            identifier = stored.identifier,
            "File version created"
        );
        Ok(stored)
    }

    /// Looks up a version by selector.
    ///
    /// No selector returns the latest version, or `None` for an empty
    /// history. A numeric selector is a 1-indexed position; anything
    /// out of range or non-numeric yields `None`, or a version-not-found
    /// error when `required` is set.
    pub async fn get_version(
        &self,
        file_id: Uuid,
        selector: Option<&str>,
        required: bool,
    ) -> AppResult<Option<FileVersion>> {
        let history = self.versions.versions_for(file_id).await?;
        let Some(selector) = selector else {
            return Ok(history.last().cloned());
        };

        let found = selector
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=history.len()).contains(n))
            .map(|n| history[n - 1].clone());
        match found {
            Some(version) => Ok(Some(version)),
            None if required => Err(AppError::version_not_found(format!(
                "File {file_id} has no version '{selector}'"
            ))),
            None => Ok(None),
        }
    }

    /// The metadata of every version, oldest first.
    pub async fn history(&self, file_id: Uuid) -> AppResult<Vec<serde_json::Value>> {
        Ok(self
            .versions
            .versions_for(file_id)
            .await?
            .into_iter()
            .map(|v| v.metadata)
            .collect())
    }

    async fn file_node(&self, file_id: Uuid) -> AppResult<FileNode> {
        let node = self
            .nodes
            .get_node(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        if node.kind != NodeKind::File {
            return Err(AppError::validation(format!(
                "Node {file_id} is a folder, not a file"
            )));
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labvault_core::error::ErrorKind;
    use labvault_store::backend::LogStore;

    use crate::testing::Harness;

    #[tokio::test]
    async fn test_identical_location_is_idempotent() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.version_service();
        let file = h.file(h.root.id, "data.csv").await;

        let first = service
            .create_version(&alice, file.id, VersionLocation::new("filesystem", "a"), None)
            .await
            .expect("v1");
        assert_eq!(first.identifier, 1);

        let again = service
            .create_version(&alice, file.id, VersionLocation::new("filesystem", "a"), None)
            .await
            .expect("duplicate");
        assert_eq!(again.id, first.id);

        let second = service
            .create_version(&alice, file.id, VersionLocation::new("filesystem", "b"), None)
            .await
            .expect("v2");
        assert_eq!(second.identifier, 2);

        let history = h.backend.versions_for(file.id).await.expect("versions");
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_checks_only_latest_version() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.version_service();
        let file = h.file(h.root.id, "data.csv").await;

        for object in ["a", "b", "a"] {
            service
                .create_version(&alice, file.id, VersionLocation::new("filesystem", object), None)
                .await
                .expect("version");
        }
        // Re-uploading to "a" is not a duplicate of latest ("a" at position
        // 3 was appended because the latest was "b").
        let history = h.backend.versions_for(file.id).await.expect("versions");
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_metadata_applied_once_with_archive_match() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.version_service();
        let file = h.file(h.root.id, "data.csv").await;
        h.backend
            .set_archive("obj-1", json!({"vault": "cold-1", "archive": "glacier"}));

        let version = service
            .create_version(
                &alice,
                file.id,
                VersionLocation::new("s3", "obj-1"),
                Some(&json!({"md5": "abc", "size": 12})),
            )
            .await
            .expect("version");

        assert_eq!(version.size, Some(12));
        assert_eq!(version.metadata["md5"], "abc");
        assert_eq!(version.metadata["vault"], "cold-1");
        assert!(h.backend.is_indexed(file.id));

        let history = service.history(file.id).await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["md5"], "abc");
    }

    #[tokio::test]
    async fn test_first_version_logs_file_created() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.version_service();
        let file = h.file(h.root.id, "data.csv").await;

        service
            .create_version(&alice, file.id, VersionLocation::new("filesystem", "a"), None)
            .await
            .expect("v1");
        service
            .create_version(&alice, file.id, VersionLocation::new("filesystem", "b"), None)
            .await
            .expect("v2");

        let logs = h
            .backend
            .logs_for_project(h.project.id)
            .await
            .expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, LogAction::FileCreated);
    }

    #[tokio::test]
    async fn test_get_version_selectors() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.version_service();
        let file = h.file(h.root.id, "data.csv").await;

        assert!(service.get_version(file.id, None, false).await.unwrap().is_none());

        for object in ["a", "b", "c"] {
            service
                .create_version(&alice, file.id, VersionLocation::new("filesystem", object), None)
                .await
                .expect("version");
        }

        let latest = service.get_version(file.id, None, false).await.unwrap();
        assert_eq!(latest.map(|v| v.identifier), Some(3));
        let second = service.get_version(file.id, Some("2"), false).await.unwrap();
        assert_eq!(second.map(|v| v.location.object), Some("b".to_string()));

        for selector in ["0", "4", "-1", "two"] {
            assert!(
                service
                    .get_version(file.id, Some(selector), false)
                    .await
                    .unwrap()
                    .is_none()
            );
            let err = service
                .get_version(file.id, Some(selector), true)
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::VersionNotFound);
        }
    }

    #[tokio::test]
    async fn test_create_version_rejects_folders() {
        let h = Harness::new().await;
        let alice = h.writer().await;
        let service = h.version_service();
        let folder = h.folder(h.root.id, "results").await;

        let err = service
            .create_version(&alice, folder.id, VersionLocation::new("filesystem", "a"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
