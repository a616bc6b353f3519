//! Request context carrying the acting user.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for the current authenticated request.
///
/// Extracted by the caller (HTTP layer, CLI, worker) and passed into
/// service methods so that every operation knows *who* is acting; the
/// actor ends up in audit entries and checkout ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// The authenticated user's ID.
    pub user_id: Uuid,
}

impl Auth {
    /// Creates a context for the given user.
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}
