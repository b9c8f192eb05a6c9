//! Property tests for forest building and traversal

use super::*;
use atlas_core::types::Id;
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
struct Node {
    id: Id,
    parent: Option<Id>,
}

impl HierarchyNode for Node {
    fn node_id(&self) -> Id {
        self.id
    }

    fn parent_id(&self) -> Option<Id> {
        self.parent
    }
}

/// Acyclic collections: node `i` may only point at an earlier node or at an
/// id outside the collection, then the whole thing is shuffled.
fn acyclic_nodes() -> impl Strategy<Value = Vec<Node>> {
    (1usize..60)
        .prop_flat_map(|n| {
            let parents = proptest::collection::vec(
                prop_oneof![
                    3 => (0..n).prop_map(Some),
                    1 => Just(None),
                    1 => Just(Some(usize::MAX)),
                ],
                n,
            );
            (Just(n), parents)
        })
        .prop_map(|(n, parents)| {
            (0..n)
                .map(|i| {
                    let parent = match parents[i] {
                        Some(usize::MAX) => Some(10_000 + i as Id),
                        Some(p) if p < i => Some(p as Id),
                        _ => None,
                    };
                    Node { id: i as Id, parent }
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

proptest! {
    #[test]
    fn prop_forest_contains_every_node_once(nodes in acyclic_nodes()) {
        let expected: HashSet<Id> = nodes.iter().map(|n| n.id).collect();
        let total = nodes.len();

        let forest = build_forest(nodes).unwrap();
        let reached: Vec<Id> = forest.iter().flat_map(|t| t.iter().map(|n| n.id)).collect();

        prop_assert_eq!(reached.len(), total);
        prop_assert_eq!(reached.into_iter().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn prop_children_point_at_their_tree_parent(nodes in acyclic_nodes()) {
        let forest = build_forest(nodes).unwrap();
        let mut stack: Vec<&TreeNode<Node>> = forest.iter().collect();

        while let Some(tree) = stack.pop() {
            for child in &tree.children {
                prop_assert_eq!(child.node.parent, Some(tree.node.id));
                stack.push(child);
            }
        }
    }

    #[test]
    fn prop_ancestry_ends_at_node_and_starts_at_root(nodes in acyclic_nodes()) {
        let hierarchy = Hierarchy::new(nodes.clone()).unwrap();

        for node in &nodes {
            let path = hierarchy.ancestry_path(node.id).unwrap();
            prop_assert_eq!(path.last().map(|n| n.id), Some(node.id));

            let root = path[0];
            let is_root = root.parent.map_or(true, |p| !hierarchy.contains(p));
            prop_assert!(is_root);
        }
    }

    #[test]
    fn prop_descendants_match_subtree(nodes in acyclic_nodes()) {
        let hierarchy = Hierarchy::new(nodes.clone()).unwrap();
        let forest = build_forest(nodes.clone()).unwrap();

        for node in &nodes {
            let subtree = forest.iter().find_map(|t| t.find(node.id)).unwrap();
            let from_tree: HashSet<Id> = subtree.iter().map(|n| n.id).filter(|&id| id != node.id).collect();
            let from_walk: HashSet<Id> = hierarchy.descendants(node.id).unwrap().iter().map(|n| n.id).collect();
            prop_assert_eq!(from_tree, from_walk);
        }
    }
}

#[test]
fn test_reparenting_under_descendant_is_a_cycle() {
    let hierarchy = Hierarchy::new(vec![
        Node { id: 1, parent: None },
        Node { id: 2, parent: Some(1) },
        Node { id: 3, parent: Some(2) },
    ])
    .unwrap();

    assert!(hierarchy.would_create_cycle(1, 3).unwrap());
    assert!(!hierarchy.would_create_cycle(3, 1).unwrap());
}
