//! Audit log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::audit::{NewLogEntry, StorageLogEntry};
use labvault_store::backend::LogStore;

/// Repository for project-level audit log rows.
#[derive(Debug, Clone)]
pub struct LogRepository {
    pool: PgPool,
}

impl LogRepository {
    /// Create a new log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for LogRepository {
    async fn add_log(&self, entry: NewLogEntry) -> AppResult<StorageLogEntry> {
        sqlx::query_as::<_, StorageLogEntry>(
            "INSERT INTO storage_logs (project_id, action, params, actor_id) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(entry.project_id)
        .bind(entry.action)
        .bind(&entry.params)
        .bind(entry.actor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write audit entry", e))
    }

    async fn logs_for_project(&self, project: Uuid) -> AppResult<Vec<StorageLogEntry>> {
        sqlx::query_as::<_, StorageLogEntry>(
            "SELECT * FROM storage_logs WHERE project_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list audit entries", e))
    }
}
