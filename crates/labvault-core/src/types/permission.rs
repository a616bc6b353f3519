//! Project permission levels.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Permission a user may hold on a project.
///
/// Levels are hierarchical: `Admin` implies `Write` implies `Read`. The
/// permission oracle may return either the expanded set or just the highest
/// grant; [`PermissionLevel::satisfied_by`] handles both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// May view the project and its files.
    Read,
    /// May add and modify files.
    Write,
    /// May administer the project, including overriding checkouts.
    Admin,
}

impl PermissionLevel {
    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }

    /// Whether this required level is satisfied by any of the granted levels.
    pub fn satisfied_by(self, granted: &HashSet<PermissionLevel>) -> bool {
        granted.iter().any(|level| *level >= self)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            _ => Err(AppError::validation(format!(
                "Invalid permission level: '{s}'"
            ))),
        }
    }
}
