//! # labvault-database
//!
//! PostgreSQL database connection management and concrete implementations
//! of the `labvault-store` backend traits.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
