//! File-version repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::audit::NewLogEntry;
use labvault_entity::version::{FileVersion, NewFileVersion};
use labvault_store::backend::VersionStore;

use super::insert_log_in_tx;

/// Repository for file version rows.
#[derive(Debug, Clone)]
pub struct VersionRepository {
    pool: PgPool,
}

impl VersionRepository {
    /// Create a new version repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VersionStore for VersionRepository {
    async fn versions_for(&self, file: Uuid) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 ORDER BY identifier ASC",
        )
        .bind(file)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list versions", e))
    }

    async fn append_version(
        &self,
        version: NewFileVersion,
        log: Option<NewLogEntry>,
    ) -> AppResult<FileVersion> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let location = serde_json::to_value(&version.location)?;
        let stored = sqlx::query_as::<_, FileVersion>(
            "INSERT INTO file_versions (file_id, identifier, creator_id, location, metadata, size) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(version.file_id)
        .bind(version.identifier)
        .bind(version.creator_id)
        .bind(&location)
        .bind(&version.metadata)
        .bind(version.size)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("file_versions_file_id_identifier_key") =>
            {
                AppError::conflict(format!(
                    "Version {} already exists for file {}",
                    version.identifier, version.file_id
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create version", e),
        })?;

        if let Some(log) = log {
            insert_log_in_tx(&mut tx, &log).await?;
        }
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit version", e)
        })?;
        Ok(stored)
    }
}
