//! File-node domain entities.

pub mod model;
pub mod trash;

pub use model::{CreateFileNode, FileNode, NodeKind};
pub use trash::TrashedFileNode;
