//! File-node repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::audit::NewLogEntry;
use labvault_entity::node::{CreateFileNode, FileNode, TrashedFileNode};
use labvault_store::backend::NodeStore;

use super::insert_log_in_tx;

/// Repository for live and trashed file-node rows.
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: PgPool,
}

impl NodeRepository {
    /// Create a new node repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NodeStore for NodeRepository {
    async fn get_node(&self, id: Uuid) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, FileNode>("SELECT * FROM file_nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find node", e))
    }

    async fn get_node_in_project(&self, id: Uuid, project: Uuid) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, FileNode>("SELECT * FROM file_nodes WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find node", e))
    }

    async fn child_by_name(&self, parent: Uuid, name: &str) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, FileNode>(
            "SELECT * FROM file_nodes WHERE parent_id = $1 AND name = $2",
        )
        .bind(parent)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find child by name", e))
    }

    async fn project_root(&self, project: Uuid) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, FileNode>(
            "SELECT * FROM file_nodes WHERE project_id = $1 AND parent_id IS NULL",
        )
        .bind(project)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find project root", e))
    }

    async fn children(&self, parent: Uuid) -> AppResult<Vec<FileNode>> {
        sqlx::query_as::<_, FileNode>(
            "SELECT * FROM file_nodes WHERE parent_id = $1 ORDER BY name ASC",
        )
        .bind(parent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    async fn insert_node(&self, data: CreateFileNode) -> AppResult<FileNode> {
        sqlx::query_as::<_, FileNode>(
            "INSERT INTO file_nodes (name, parent_id, project_id, kind) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&data.name)
        .bind(data.parent_id)
        .bind(data.project_id)
        .bind(data.kind)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("file_nodes_parent_id_name_key") =>
            {
                AppError::conflict(format!(
                    "Node '{}' already exists under this parent",
                    data.name
                ))
            }
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("file_nodes_project_root_key") =>
            {
                AppError::conflict(format!(
                    "Project {} already has a root node",
                    data.project_id
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create node", e),
        })
    }

    async fn set_parent_and_name(
        &self,
        id: Uuid,
        new_parent: Uuid,
        new_name: Option<String>,
        log: NewLogEntry,
    ) -> AppResult<FileNode> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let node = sqlx::query_as::<_, FileNode>(
            "UPDATE file_nodes SET parent_id = $2, name = COALESCE($3, name), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_parent)
        .bind(new_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("file_nodes_parent_id_name_key") =>
            {
                AppError::conflict("A node of that name already exists under the target parent")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to move node", e),
        })?
        .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?;

        insert_log_in_tx(&mut tx, &log).await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit move", e)
        })?;
        Ok(node)
    }

    async fn set_checkout(
        &self,
        id: Uuid,
        holder: Option<Uuid>,
        expected: Option<Uuid>,
        log: NewLogEntry,
    ) -> AppResult<FileNode> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // The WHERE clause re-evaluates the expected holder under row lock,
        // so a concurrent checkout cannot be silently overwritten.
        let updated = sqlx::query_as::<_, FileNode>(
            "UPDATE file_nodes SET checkout_user_id = $2, updated_at = NOW() \
             WHERE id = $1 AND checkout_user_id IS NOT DISTINCT FROM $3 RETURNING *",
        )
        .bind(id)
        .bind(holder)
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update checkout", e)
        })?;

        let Some(node) = updated else {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM file_nodes WHERE id = $1",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find node", e))?;
            return Err(if exists == 0 {
                AppError::not_found(format!("Node {id} not found"))
            } else {
                AppError::checked_out(format!("Node {id} checkout changed concurrently"))
            });
        };

        insert_log_in_tx(&mut tx, &log).await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit checkout", e)
        })?;
        Ok(node)
    }

    async fn trash_subtree(
        &self,
        id: Uuid,
        deleted_by: Option<Uuid>,
        log: NewLogEntry,
    ) -> AppResult<Vec<TrashedFileNode>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let mut trashed = sqlx::query_as::<_, TrashedFileNode>(
            "WITH RECURSIVE subtree AS ( \
                SELECT * FROM file_nodes WHERE id = $1 \
                UNION ALL \
                SELECT f.* FROM file_nodes f INNER JOIN subtree s ON f.parent_id = s.id \
             ) \
             INSERT INTO trashed_file_nodes (id, name, parent_id, project_id, kind, deleted_by) \
             SELECT id, name, parent_id, project_id, kind, $2 FROM subtree \
             RETURNING *",
        )
        .bind(id)
        .bind(deleted_by)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to trash subtree", e))?;

        if trashed.is_empty() {
            return Err(AppError::not_found(format!("Node {id} not found")));
        }
        // Requested node first; RETURNING row order is not guaranteed.
        trashed.sort_by_key(|record| record.id != id);

        let ids: Vec<Uuid> = trashed.iter().map(|record| record.id).collect();
        sqlx::query("DELETE FROM file_nodes WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove live nodes", e)
            })?;

        insert_log_in_tx(&mut tx, &log).await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit trash", e)
        })?;

        debug!(node_id = %id, count = trashed.len(), "Trashed subtree");
        Ok(trashed)
    }

    async fn get_trashed(&self, id: Uuid) -> AppResult<Option<TrashedFileNode>> {
        sqlx::query_as::<_, TrashedFileNode>("SELECT * FROM trashed_file_nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find trashed node", e)
            })
    }

    async fn trashed_children(&self, parent: Uuid) -> AppResult<Vec<TrashedFileNode>> {
        sqlx::query_as::<_, TrashedFileNode>(
            "SELECT * FROM trashed_file_nodes WHERE parent_id = $1 ORDER BY name ASC",
        )
        .bind(parent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list trashed children", e)
        })
    }
}
