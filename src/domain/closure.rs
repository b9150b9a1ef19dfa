//! Device dependency tree walking.
//!
//! The `via_device_id` relation is assumed to be a forest: every device has
//! at most one parent and there are no cycles. Nothing here checks that.

use tracing::instrument;

use crate::domain::index::DeviceSets;

/// A device reached by the walk and its distance from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedDevice {
    pub id: String,
    pub depth: usize,
}

/// Pre-order depth-first walk from `root`.
///
/// Children are visited in the order they were indexed. Uses an explicit
/// stack so deep hierarchies cannot exhaust the call stack.
#[instrument(level = "debug", skip(children_by_parent))]
pub fn walk_descendants(root: &str, children_by_parent: &DeviceSets) -> Vec<VisitedDevice> {
    let mut visited = Vec::new();
    let mut stack = vec![(root.to_string(), 0)];

    while let Some((id, depth)) = stack.pop() {
        if let Some(children) = children_by_parent.get(&id) {
            // reversed, so the first child is popped first
            for child in children.iter().rev() {
                stack.push((child.clone(), depth + 1));
            }
        }
        visited.push(VisitedDevice { id, depth });
    }

    visited
}

/// The root device followed by all of its transitive descendants.
pub fn device_closure(root: &str, children_by_parent: &DeviceSets) -> Vec<String> {
    walk_descendants(root, children_by_parent)
        .into_iter()
        .map(|visited| visited.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    fn tree(edges: &[(&str, &str)]) -> DeviceSets {
        let mut children = DeviceSets::new();
        for (parent, child) in edges {
            children
                .entry(parent.to_string())
                .or_insert_with(IndexSet::new)
                .insert(child.to_string());
        }
        children
    }

    #[test]
    fn given_leaf_when_walking_then_only_root() {
        assert_eq!(device_closure("x", &tree(&[])), vec!["x"]);
    }

    #[test]
    fn given_nested_tree_when_walking_then_matches_recursive_preorder() {
        let children = tree(&[("r", "a"), ("r", "b"), ("a", "a1"), ("a", "a2"), ("b", "b1")]);

        let walk = walk_descendants("r", &children);

        let ids: Vec<&str> = walk.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["r", "a", "a1", "a2", "b", "b1"]);
        let depths: Vec<usize> = walk.iter().map(|v| v.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1, 2]);
    }

    #[test]
    fn given_subtree_root_when_walking_then_ignores_siblings() {
        let children = tree(&[("r", "a"), ("r", "b"), ("a", "a1")]);
        assert_eq!(device_closure("a", &children), vec!["a", "a1"]);
    }
}
