//! Project repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::project::{Institution, Project};
use labvault_store::backend::ProjectStore;

/// Repository for project rows and the institution projection.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Create a new project repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find project", e))
    }

    async fn mark_preprint_orphan(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE projects SET is_preprint_orphan = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to flag preprint orphan", e)
        })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Project {id} not found")));
        }
        Ok(())
    }

    async fn institutions(&self) -> AppResult<Vec<Institution>> {
        let rows = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects \
             WHERE institution_id IS NOT NULL AND is_deleted = FALSE \
             ORDER BY institution_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list institutions", e)
        })?;
        Ok(rows.iter().filter_map(Institution::from_project).collect())
    }

    async fn find_institution(&self, institution_id: &str) -> AppResult<Option<Institution>> {
        let row = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects \
             WHERE institution_id = $1 AND is_deleted = FALSE",
        )
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find institution", e)
        })?;
        Ok(row.as_ref().and_then(Institution::from_project))
    }
}
