//! Tag repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::audit::NewLogEntry;
use labvault_entity::tag::Tag;
use labvault_store::backend::{TagRegistry, TagStore};

use super::insert_log_in_tx;

/// Repository for the tag registry and file-tag associations.
#[derive(Debug, Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    /// Create a new tag repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for TagRepository {
    async fn tags_for(&self, file: Uuid) -> AppResult<Vec<Tag>> {
        sqlx::query_as::<_, Tag>(
            "SELECT t.* FROM tags t \
             INNER JOIN file_tags ft ON ft.tag_label = t.label \
             WHERE ft.file_id = $1 ORDER BY ft.id ASC",
        )
        .bind(file)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file tags", e))
    }

    async fn attach_tag(
        &self,
        file: Uuid,
        label: &str,
        log: Option<NewLogEntry>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query(
            "INSERT INTO file_tags (file_id, tag_label) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(file)
        .bind(label)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to attach tag", e))?;

        if let Some(log) = log {
            insert_log_in_tx(&mut tx, &log).await?;
        }
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit tag", e))?;
        Ok(())
    }

    async fn detach_tag(
        &self,
        file: Uuid,
        label: &str,
        log: Option<NewLogEntry>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let result = sqlx::query("DELETE FROM file_tags WHERE file_id = $1 AND tag_label = $2")
            .bind(file)
            .bind(label)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to detach tag", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::tag_not_found(format!(
                "File {file} does not carry tag '{label}'"
            )));
        }

        if let Some(log) = log {
            insert_log_in_tx(&mut tx, &log).await?;
        }
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit tag", e))?;
        Ok(())
    }
}

#[async_trait]
impl TagRegistry for TagRepository {
    async fn find_tag(&self, label: &str) -> AppResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE label = $1")
            .bind(label)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find tag", e))
    }

    async fn find_or_create_tag(&self, label: &str) -> AppResult<Tag> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (label) VALUES ($1) \
             ON CONFLICT (label) DO UPDATE SET label = EXCLUDED.label \
             RETURNING *",
        )
        .bind(label)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create tag", e))
    }
}
