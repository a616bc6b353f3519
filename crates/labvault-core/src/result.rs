//! Application-wide result alias.

use crate::error::AppError;

/// Shorthand result type used by every fallible LabVault operation.
pub type AppResult<T> = Result<T, AppError>;
