//! # labvault-entity
//!
//! Domain entity models for the LabVault storage core. Every struct in this
//! crate represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod node;
pub mod project;
pub mod settings;
pub mod tag;
pub mod version;
