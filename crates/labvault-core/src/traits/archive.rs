//! Archive registry trait.

use async_trait::async_trait;

use crate::result::AppResult;

/// Best-effort lookup of archive metadata for a storage location.
///
/// During version creation the core asks whether the uploaded object is
/// already known to a cold-storage archive; a match enriches the version
/// metadata. A miss or a lookup failure is never surfaced to the caller.
#[async_trait]
pub trait ArchiveRegistry: Send + Sync + 'static {
    /// Archive metadata for the storage object at `location_object`, if the
    /// registry knows it.
    async fn find_matching(&self, location_object: &str)
        -> AppResult<Option<serde_json::Value>>;
}
