//! Search index sink trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Sink for keeping the external search index in step with file mutations.
///
/// The index implementation (and its failure policy beyond the returned
/// error) is the collaborator's concern.
#[async_trait]
pub trait SearchIndex: Send + Sync + 'static {
    /// Submit or refresh a file document in the index.
    async fn index_file(&self, file: Uuid) -> AppResult<()>;

    /// Remove a file document from the index.
    async fn remove_file(&self, file: Uuid) -> AppResult<()>;
}
