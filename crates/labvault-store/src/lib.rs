//! # labvault-store
//!
//! Backend traits for the LabVault storage core, plus a complete in-memory
//! backend. The traits are the seam between the business rules in
//! `labvault-service` and a concrete datastore; `labvault-database`
//! implements them on PostgreSQL, while the in-memory backend here serves
//! tests and embedded use.
//!
//! Every mutating trait method is atomic: implementations either apply the
//! whole change (state plus any accompanying audit entry) or none of it.

pub mod backend;
pub mod memory;

pub use backend::{
    LogStore, NodeStore, ProjectStore, SettingsStore, TagRegistry, TagStore, VersionStore,
};
pub use memory::MemoryBackend;
