//! File version entities.

pub mod model;

pub use model::{FileVersion, NewFileVersion, VersionLocation};
