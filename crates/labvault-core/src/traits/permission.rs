//! Permission oracle trait.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;
use crate::types::permission::PermissionLevel;

/// Resolves the permission levels a user holds on a project.
///
/// The storage core never decides membership itself; it asks the oracle and
/// applies its own rules (write required for checkout, admin required to
/// override a foreign lock).
#[async_trait]
pub trait PermissionOracle: Send + Sync + 'static {
    /// All permission levels `user` holds on `project`.
    ///
    /// Returns the empty set for unknown users or projects.
    async fn permissions_of(&self, user: Uuid, project: Uuid)
        -> AppResult<HashSet<PermissionLevel>>;
}
