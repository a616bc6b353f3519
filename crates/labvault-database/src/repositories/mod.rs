//! Concrete PostgreSQL repositories implementing the store traits.

pub mod log;
pub mod node;
pub mod project;
pub mod settings;
pub mod tag;
pub mod version;

use sqlx::{Postgres, Transaction};

use labvault_core::error::{AppError, ErrorKind};
use labvault_core::result::AppResult;
use labvault_entity::audit::NewLogEntry;

pub use log::LogRepository;
pub use node::NodeRepository;
pub use project::ProjectRepository;
pub use settings::SettingsRepository;
pub use tag::TagRepository;
pub use version::VersionRepository;

/// Insert an audit entry inside an open transaction.
///
/// Combined store operations call this before committing so the state
/// change and its log entry land atomically.
pub(crate) async fn insert_log_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: &NewLogEntry,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO storage_logs (project_id, action, params, actor_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.project_id)
    .bind(entry.action)
    .bind(&entry.params)
    .bind(entry.actor_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write audit entry", e))?;
    Ok(())
}
