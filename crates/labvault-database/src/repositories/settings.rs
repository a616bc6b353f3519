//! Node-settings repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::settings::NodeSettings;
use labvault_store::backend::SettingsStore;

/// Repository for per-project storage settings rows.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    /// Create a new settings repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn settings_for_project(&self, project: Uuid) -> AppResult<Option<NodeSettings>> {
        sqlx::query_as::<_, NodeSettings>("SELECT * FROM node_settings WHERE project_id = $1")
            .bind(project)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find settings", e)
            })
    }

    async fn insert_settings(&self, project: Uuid) -> AppResult<NodeSettings> {
        sqlx::query_as::<_, NodeSettings>(
            "INSERT INTO node_settings (project_id) VALUES ($1) RETURNING *",
        )
        .bind(project)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("node_settings_project_id_key") =>
            {
                AppError::conflict(format!("Project {project} already has storage settings"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create settings", e),
        })
    }

    async fn attach_root(&self, id: Uuid, root: Uuid) -> AppResult<NodeSettings> {
        sqlx::query_as::<_, NodeSettings>(
            "UPDATE node_settings SET root_node_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(root)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to attach root", e))?
        .ok_or_else(|| AppError::not_found(format!("Settings {id} not found")))
    }
}
