//! Materialized path resolution.
//!
//! Paths are never stored; they are derived by walking parent references
//! from a node to its root and joining names. The walk is iterative and
//! costs O(depth) store lookups per node. There is no caching here: callers
//! that need paths for many nodes at once should use
//! [`materialized_paths`], which loads each distinct ancestor only once.

use std::collections::HashMap;

use uuid::Uuid;

use labvault_core::error::AppError;
use labvault_core::result::AppResult;
use labvault_entity::node::{FileNode, NodeKind};
use labvault_store::backend::NodeStore;

/// The materialized (human-readable) path of a node.
///
/// The root contributes the empty segment and resolves to `/`. Files render
/// as `/seg1/seg2/name`, folders with a trailing `/`.
///
/// Costs one store lookup per ancestor; avoid calling this in a loop over
/// many nodes.
pub async fn materialized_path(nodes: &dyn NodeStore, node: &FileNode) -> AppResult<String> {
    let mut cache = HashMap::new();
    path_via_cache(nodes, node, &mut cache).await
}

/// Materialized paths for a batch of nodes, in input order.
///
/// Each distinct ancestor is fetched from the store at most once across the
/// whole batch.
pub async fn materialized_paths(
    nodes: &dyn NodeStore,
    batch: &[FileNode],
) -> AppResult<Vec<String>> {
    let mut cache: HashMap<Uuid, FileNode> = HashMap::new();
    for node in batch {
        cache.insert(node.id, node.clone());
    }

    let mut paths = Vec::with_capacity(batch.len());
    for node in batch {
        paths.push(path_via_cache(nodes, node, &mut cache).await?);
    }
    Ok(paths)
}

async fn path_via_cache(
    nodes: &dyn NodeStore,
    node: &FileNode,
    cache: &mut HashMap<Uuid, FileNode>,
) -> AppResult<String> {
    if node.is_root() {
        return Ok("/".to_string());
    }

    let mut segments = vec![node.name.clone()];
    let mut parent_id = node.parent_id;
    while let Some(id) = parent_id {
        let ancestor = match cache.get(&id) {
            Some(ancestor) => ancestor.clone(),
            None => {
                let fetched = nodes.get_node(id).await?.ok_or_else(|| {
                    AppError::internal(format!(
                        "Broken tree linkage: ancestor {id} of node {} is missing",
                        node.id
                    ))
                })?;
                cache.insert(id, fetched.clone());
                fetched
            }
        };
        parent_id = ancestor.parent_id;
        // The root's empty name is not a path segment.
        if parent_id.is_some() {
            segments.push(ancestor.name.clone());
        }
    }

    segments.reverse();
    let joined = segments.join("/");
    Ok(match node.kind {
        NodeKind::File => format!("/{joined}"),
        NodeKind::Folder => format!("/{joined}/"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[tokio::test]
    async fn test_root_resolves_to_slash() {
        let h = Harness::new().await;
        let path = materialized_path(h.backend.as_ref(), &h.root)
            .await
            .expect("path");
        assert_eq!(path, "/");
    }

    #[tokio::test]
    async fn test_nested_file_and_folder_paths() {
        let h = Harness::new().await;
        let results = h.folder(h.root.id, "results").await;
        let run = h.folder(results.id, "run-1").await;
        let file = h.file(run.id, "data.csv").await;

        assert_eq!(
            materialized_path(h.backend.as_ref(), &file).await.unwrap(),
            "/results/run-1/data.csv"
        );
        assert_eq!(
            materialized_path(h.backend.as_ref(), &run).await.unwrap(),
            "/results/run-1/"
        );
    }

    #[tokio::test]
    async fn test_deep_tree_does_not_recurse() {
        let h = Harness::new().await;
        let mut parent = h.root.id;
        for depth in 0..500 {
            parent = h.folder(parent, &format!("d{depth}")).await.id;
        }
        let leaf = h.file(parent, "leaf.txt").await;

        let path = materialized_path(h.backend.as_ref(), &leaf)
            .await
            .expect("path");
        assert!(path.starts_with("/d0/d1/"));
        assert!(path.ends_with("/leaf.txt"));
    }

    #[tokio::test]
    async fn test_batch_paths_match_single_paths() {
        let h = Harness::new().await;
        let docs = h.folder(h.root.id, "docs").await;
        let a = h.file(docs.id, "a.txt").await;
        let b = h.file(docs.id, "b.txt").await;

        let batch = materialized_paths(h.backend.as_ref(), &[a.clone(), b.clone(), docs.clone()])
            .await
            .expect("batch");
        assert_eq!(batch, vec!["/docs/a.txt", "/docs/b.txt", "/docs/"]);
    }
}
