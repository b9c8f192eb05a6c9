//! Forest construction from flat parent-pointer collections
//!
//! One linear pass indexes the nodes by id, a second pass attaches every node
//! to its parent. Nodes whose parent is not part of the collection become
//! roots, which is what a filtered subset (e.g. only visible menus) needs.

use atlas_core::types::{Division, Id, Menu, Record};
use atlas_core::{AtlasError, EntityKind};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Hierarchy-related errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// A parent chain never reaches a root
    #[error("parent chain of node {0} does not terminate")]
    CycleDetected(Id),

    /// The same id appears twice in one collection
    #[error("duplicate node id: {0}")]
    DuplicateNode(Id),

    /// The requested node is not part of the collection
    #[error("unknown node: {0}")]
    UnknownNode(Id),
}

impl HierarchyError {
    /// Attach the entity kind the collection was made of
    pub fn into_atlas(self, kind: EntityKind) -> AtlasError {
        match self {
            HierarchyError::CycleDetected(id) => AtlasError::CycleDetected { kind, id },
            HierarchyError::DuplicateNode(id) => {
                AtlasError::invalid(format!("duplicate {} id {}", kind, id))
            }
            HierarchyError::UnknownNode(id) => AtlasError::not_found(kind, id),
        }
    }
}

/// A node that may point at a parent of the same kind
pub trait HierarchyNode {
    fn node_id(&self) -> Id;
    fn parent_id(&self) -> Option<Id>;
}

impl HierarchyNode for Menu {
    fn node_id(&self) -> Id {
        self.id
    }

    fn parent_id(&self) -> Option<Id> {
        self.parent_id
    }
}

impl HierarchyNode for Division {
    fn node_id(&self) -> Id {
        self.id
    }

    fn parent_id(&self) -> Option<Id> {
        self.parent_id
    }
}

impl HierarchyNode for Record {
    fn node_id(&self) -> Id {
        self.id()
    }

    fn parent_id(&self) -> Option<Id> {
        Record::parent_id(self)
    }
}

impl<N: HierarchyNode> HierarchyNode for &N {
    fn node_id(&self) -> Id {
        (**self).node_id()
    }

    fn parent_id(&self) -> Option<Id> {
        (**self).parent_id()
    }
}

/// A node together with its ordered children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<N> {
    #[serde(flatten)]
    pub node: N,
    pub children: Vec<TreeNode<N>>,
}

impl<N> TreeNode<N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including the root
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Depth-first, pre-order traversal of this subtree
    pub fn iter(&self) -> Preorder<'_, N> {
        Preorder { stack: vec![self] }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl<N: HierarchyNode> TreeNode<N> {
    /// Find a node of this subtree by id
    pub fn find(&self, id: Id) -> Option<&TreeNode<N>> {
        if self.node.node_id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Pre-order iterator over a [`TreeNode`] subtree
pub struct Preorder<'a, N> {
    stack: Vec<&'a TreeNode<N>>,
}

impl<'a, N> Iterator for Preorder<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack.extend(current.children.iter().rev());
        Some(&current.node)
    }
}

/// Build an ordered forest from a flat collection
///
/// Roots and siblings keep their relative input order. A declared parent
/// that is absent from `nodes` makes the node a root.
///
/// # Errors
///
/// - `DuplicateNode` if two nodes share an id
/// - `CycleDetected` if some parent chain loops instead of reaching a root
pub fn build_forest<N: HierarchyNode>(nodes: Vec<N>) -> Result<Vec<TreeNode<N>>, HierarchyError> {
    let mut index: HashMap<Id, usize> = HashMap::with_capacity(nodes.len());
    for (pos, node) in nodes.iter().enumerate() {
        if index.insert(node.node_id(), pos).is_some() {
            return Err(HierarchyError::DuplicateNode(node.node_id()));
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (pos, node) in nodes.iter().enumerate() {
        match node.parent_id().and_then(|parent| index.get(&parent)) {
            Some(&parent_pos) => children[parent_pos].push(pos),
            None => roots.push(pos),
        }
    }

    let mut slots: Vec<Option<N>> = nodes.into_iter().map(Some).collect();
    let forest: Vec<TreeNode<N>> = roots
        .iter()
        .filter_map(|&root| assemble(root, &children, &mut slots))
        .collect();

    // Whatever was not reached from a root sits on or under a cycle
    if let Some(stuck) = slots.iter().position(Option::is_some) {
        return Err(HierarchyError::CycleDetected(cycle_member(
            stuck, &slots, &index,
        )));
    }

    Ok(forest)
}

fn assemble<N>(
    pos: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<N>],
) -> Option<TreeNode<N>> {
    let node = slots[pos].take()?;
    let mut tree = TreeNode::new(node);
    tree.children = children[pos]
        .iter()
        .filter_map(|&child| assemble(child, children, slots))
        .collect();
    Some(tree)
}

/// Follow parent pointers from an unplaced node until landing on the cycle
fn cycle_member<N: HierarchyNode>(
    start: usize,
    slots: &[Option<N>],
    index: &HashMap<Id, usize>,
) -> Id {
    let mut pos = start;
    for _ in 0..slots.len() {
        let next = slots[pos]
            .as_ref()
            .and_then(|node| node.parent_id())
            .and_then(|parent| index.get(&parent).copied());
        match next {
            Some(parent_pos) => pos = parent_pos,
            None => break,
        }
    }
    slots[pos]
        .as_ref()
        .map(|node| node.node_id())
        .unwrap_or_default()
}
