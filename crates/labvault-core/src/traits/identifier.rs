//! Global identifier (guid) registry trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// The platform-wide registry mapping short external identifiers (guids)
/// to the entities they refer to.
///
/// The storage core only reads from the registry, when collecting the
/// identifiers of files in a (possibly trashed) subtree.
#[async_trait]
pub trait IdentifierRegistry: Send + Sync + 'static {
    /// The primary external identifier of a referent, if one was assigned.
    async fn resolve(&self, referent: Uuid) -> AppResult<Option<String>>;

    /// All external identifiers assigned to a referent, oldest first.
    async fn ids_for(&self, referent: Uuid) -> AppResult<Vec<String>>;
}
