//! Ancestry and descendant resolution
//!
//! Two ways to walk a parent-pointer hierarchy:
//!
//! - [`Hierarchy`]: an arena over a snapshot already in memory (preferred)
//! - [`HierarchySource`]: single-step lookups against a store or transaction,
//!   walked by [`ancestry_ids`] and [`descendant_ids`]

use super::forest::{build_forest, HierarchyError, HierarchyNode, TreeNode};
use atlas_core::error::Result;
use atlas_core::types::{EntityKind, Filter, Id};
use atlas_core::{AtlasError, RelationStore, Transaction};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};

/// Snapshot of a hierarchy indexed by id
#[derive(Debug, Clone)]
pub struct Hierarchy<N> {
    nodes: Vec<N>,
    index: HashMap<Id, usize>,
    /// Child positions keyed by declared parent id
    children: HashMap<Id, Vec<usize>>,
}

impl<N: HierarchyNode> Hierarchy<N> {
    /// Index a flat collection
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if two nodes share an id.
    pub fn new(nodes: Vec<N>) -> std::result::Result<Self, HierarchyError> {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<Id, Vec<usize>> = HashMap::new();

        for (pos, node) in nodes.iter().enumerate() {
            if index.insert(node.node_id(), pos).is_some() {
                return Err(HierarchyError::DuplicateNode(node.node_id()));
            }
            if let Some(parent) = node.parent_id() {
                children.entry(parent).or_default().push(pos);
            }
        }

        Ok(Self {
            nodes,
            index,
            children,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: Id) -> Option<&N> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// All nodes, in input order
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Parent of a node, if the parent is part of the snapshot
    pub fn parent(&self, id: Id) -> Option<&N> {
        self.get(id)
            .and_then(|node| node.parent_id())
            .and_then(|parent| self.get(parent))
    }

    /// Direct children, in input order
    pub fn children(&self, id: Id) -> Vec<&N> {
        self.children
            .get(&id)
            .map(|positions| positions.iter().map(|&pos| &self.nodes[pos]).collect())
            .unwrap_or_default()
    }

    pub fn has_children(&self, id: Id) -> bool {
        self.children.get(&id).is_some_and(|c| !c.is_empty())
    }

    /// Path from the root down to `id`, both ends included
    ///
    /// A parent pointer leaving the snapshot ends the walk, as it does when
    /// building the forest.
    ///
    /// # Errors
    ///
    /// - `UnknownNode` if `id` is not in the snapshot
    /// - `CycleDetected` if the walk takes more hops than there are nodes
    pub fn ancestry_path(&self, id: Id) -> std::result::Result<Vec<&N>, HierarchyError> {
        let mut current = self.get(id).ok_or(HierarchyError::UnknownNode(id))?;
        let mut path = vec![current];

        while let Some(parent) = current.parent_id().and_then(|p| self.get(p)) {
            if path.len() > self.nodes.len() {
                return Err(HierarchyError::CycleDetected(id));
            }
            path.push(parent);
            current = parent;
        }

        path.reverse();
        Ok(path)
    }

    /// Every node reachable from `id` through child edges, `id` excluded,
    /// in breadth-first order
    ///
    /// # Errors
    ///
    /// - `UnknownNode` if `id` is not in the snapshot
    /// - `CycleDetected` if the walk comes back to a node already seen
    pub fn descendants(&self, id: Id) -> std::result::Result<Vec<&N>, HierarchyError> {
        if !self.contains(id) {
            return Err(HierarchyError::UnknownNode(id));
        }

        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                let child_id = child.node_id();
                if !seen.insert(child_id) {
                    return Err(HierarchyError::CycleDetected(child_id));
                }
                found.push(child);
                queue.push_back(child_id);
            }
        }

        Ok(found)
    }

    /// Whether re-parenting `id` under `new_parent` would close a loop
    pub fn would_create_cycle(&self, id: Id, new_parent: Id) -> std::result::Result<bool, HierarchyError> {
        if id == new_parent {
            return Ok(true);
        }
        match self.ancestry_path(new_parent) {
            Ok(path) => Ok(path.iter().any(|node| node.node_id() == id)),
            Err(HierarchyError::UnknownNode(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Consume the snapshot into an ordered forest
    pub fn into_forest(self) -> std::result::Result<Vec<TreeNode<N>>, HierarchyError> {
        build_forest(self.nodes)
    }
}

/// Single-step parent/child lookups
#[async_trait]
pub trait HierarchySource: Send {
    /// Kind of the nodes this source walks
    fn kind(&self) -> EntityKind;

    /// `None` if the node does not exist, otherwise its parent pointer
    async fn parent_of(&mut self, id: Id) -> Result<Option<Option<Id>>>;

    /// Ids of the direct children
    async fn children_of(&mut self, id: Id) -> Result<Vec<Id>>;
}

/// [`HierarchySource`] backed by committed store state
pub struct StoreHierarchy<'a> {
    store: &'a dyn RelationStore,
    kind: EntityKind,
}

impl<'a> StoreHierarchy<'a> {
    pub fn new(store: &'a dyn RelationStore, kind: EntityKind) -> Self {
        Self { store, kind }
    }
}

#[async_trait]
impl<'a> HierarchySource for StoreHierarchy<'a> {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn parent_of(&mut self, id: Id) -> Result<Option<Option<Id>>> {
        let record = self.store.get_by_id(self.kind, id).await?;
        Ok(record.map(|r| r.parent_id()))
    }

    async fn children_of(&mut self, id: Id) -> Result<Vec<Id>> {
        let records = self.store.get_all(self.kind, &Filter::children_of(id)).await?;
        Ok(records.iter().map(|r| r.id()).collect())
    }
}

/// [`HierarchySource`] reading through an open transaction
pub struct TxHierarchy<'a> {
    tx: &'a mut dyn Transaction,
    kind: EntityKind,
}

impl<'a> TxHierarchy<'a> {
    pub fn new(tx: &'a mut dyn Transaction, kind: EntityKind) -> Self {
        Self { tx, kind }
    }
}

#[async_trait]
impl<'a> HierarchySource for TxHierarchy<'a> {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn parent_of(&mut self, id: Id) -> Result<Option<Option<Id>>> {
        let record = self.tx.get_by_id(self.kind, id).await?;
        Ok(record.map(|r| r.parent_id()))
    }

    async fn children_of(&mut self, id: Id) -> Result<Vec<Id>> {
        let records = self.tx.get_all(self.kind, &Filter::children_of(id)).await?;
        Ok(records.iter().map(|r| r.id()).collect())
    }
}

/// Ids from the root down to `id`, both ends included
///
/// # Errors
///
/// - `NotFound` if `id` does not exist
/// - `CycleDetected` if a node repeats before a root is reached
pub async fn ancestry_ids<S: HierarchySource + ?Sized>(source: &mut S, id: Id) -> Result<Vec<Id>> {
    let kind = source.kind();
    let mut parent = source
        .parent_of(id)
        .await?
        .ok_or_else(|| AtlasError::not_found(kind, id))?;

    let mut path = vec![id];
    let mut seen = HashSet::from([id]);

    while let Some(next) = parent {
        if !seen.insert(next) {
            return Err(AtlasError::CycleDetected { kind, id: next });
        }
        match source.parent_of(next).await? {
            Some(grandparent) => {
                path.push(next);
                parent = grandparent;
            }
            // Dangling pointer: treat the last existing node as the root
            None => break,
        }
    }

    path.reverse();
    Ok(path)
}

/// Ids of every node below `id`, breadth-first
///
/// # Errors
///
/// - `NotFound` if `id` does not exist
/// - `CycleDetected` if a node is reached twice
pub async fn descendant_ids<S: HierarchySource + ?Sized>(source: &mut S, id: Id) -> Result<Vec<Id>> {
    let kind = source.kind();
    if source.parent_of(id).await?.is_none() {
        return Err(AtlasError::not_found(kind, id));
    }

    let mut seen = HashSet::from([id]);
    let mut queue = VecDeque::from([id]);
    let mut found = Vec::new();

    while let Some(current) = queue.pop_front() {
        for child in source.children_of(current).await? {
            if !seen.insert(child) {
                return Err(AtlasError::CycleDetected { kind, id: child });
            }
            found.push(child);
            queue.push_back(child);
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRelationStore;
    use atlas_core::types::Menu;
    use atlas_core::ErrorKind;

    #[derive(Debug, Clone, PartialEq)]
    struct Node(Id, Option<Id>);

    impl HierarchyNode for Node {
        fn node_id(&self) -> Id {
            self.0
        }

        fn parent_id(&self) -> Option<Id> {
            self.1
        }
    }

    fn sample() -> Hierarchy<Node> {
        // 1
        // ├── 2
        // │   └── 4
        // └── 3
        //     └── 5
        //         └── 6
        Hierarchy::new(vec![
            Node(1, None),
            Node(2, Some(1)),
            Node(3, Some(1)),
            Node(4, Some(2)),
            Node(5, Some(3)),
            Node(6, Some(5)),
        ])
        .unwrap()
    }

    #[test]
    fn test_ancestry_path_root_first() {
        let h = sample();
        let path: Vec<Id> = h.ancestry_path(6).unwrap().iter().map(|n| n.0).collect();
        assert_eq!(path, vec![1, 3, 5, 6]);

        let root: Vec<Id> = h.ancestry_path(1).unwrap().iter().map(|n| n.0).collect();
        assert_eq!(root, vec![1]);
    }

    #[test]
    fn test_ancestry_unknown_node() {
        let h = sample();
        assert_eq!(h.ancestry_path(42).unwrap_err(), HierarchyError::UnknownNode(42));
    }

    #[test]
    fn test_ancestry_cycle_is_flagged() {
        let h = Hierarchy::new(vec![Node(1, Some(3)), Node(2, Some(1)), Node(3, Some(2))]).unwrap();
        assert_eq!(h.ancestry_path(2).unwrap_err(), HierarchyError::CycleDetected(2));
    }

    #[test]
    fn test_descendants_and_children() {
        let h = sample();
        let below: Vec<Id> = h.descendants(3).unwrap().iter().map(|n| n.0).collect();
        assert_eq!(below, vec![5, 6]);

        let direct: Vec<Id> = h.children(1).iter().map(|n| n.0).collect();
        assert_eq!(direct, vec![2, 3]);

        assert!(h.has_children(5));
        assert!(!h.has_children(6));
        assert!(h.descendants(6).unwrap().is_empty());
    }

    #[test]
    fn test_would_create_cycle() {
        let h = sample();
        assert!(h.would_create_cycle(3, 6).unwrap());
        assert!(h.would_create_cycle(3, 3).unwrap());
        assert!(!h.would_create_cycle(2, 6).unwrap());
        assert!(!h.would_create_cycle(2, 99).unwrap());
    }

    #[test]
    fn test_parent_lookup() {
        let h = sample();
        assert_eq!(h.parent(4).map(|n| n.0), Some(2));
        assert!(h.parent(1).is_none());
        assert_eq!(h.len(), 6);
    }

    #[test]
    fn test_into_forest() {
        let forest = sample().into_forest().unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].size(), 6);
    }

    /// Insert menus as given, bypassing the integrity guard
    async fn menu_store(parents: &[Option<Id>]) -> InMemoryRelationStore {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();
        for (i, parent) in parents.iter().enumerate() {
            let mut menu = Menu::new(format!("m{}", i + 1));
            menu.parent_id = *parent;
            tx.insert(menu.into()).await.unwrap();
        }
        tx.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_store_walk_chain() {
        // 1 <- 2 <- 3, and 4 under 1
        let store = menu_store(&[None, Some(1), Some(2), Some(1)]).await;
        let mut source = StoreHierarchy::new(&store, EntityKind::Menu);

        assert_eq!(ancestry_ids(&mut source, 3).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(ancestry_ids(&mut source, 1).await.unwrap(), vec![1]);
        assert_eq!(descendant_ids(&mut source, 1).await.unwrap(), vec![2, 4, 3]);
        assert!(descendant_ids(&mut source, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_walk_stops_at_dangling_parent() {
        let store = menu_store(&[None, Some(99)]).await;
        let mut source = StoreHierarchy::new(&store, EntityKind::Menu);

        assert_eq!(ancestry_ids(&mut source, 2).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_store_walk_reports_loop() {
        // 1 -> 2 -> 1
        let store = menu_store(&[Some(2), Some(1)]).await;
        let mut source = StoreHierarchy::new(&store, EntityKind::Menu);

        let err = ancestry_ids(&mut source, 1).await.unwrap_err();
        assert!(matches!(err, AtlasError::CycleDetected { kind: EntityKind::Menu, id: 1 }));

        let err = descendant_ids(&mut source, 1).await.unwrap_err();
        assert!(matches!(err, AtlasError::CycleDetected { kind: EntityKind::Menu, id: 1 }));
    }

    #[tokio::test]
    async fn test_store_walk_unknown_node() {
        let store = menu_store(&[None]).await;
        let mut source = StoreHierarchy::new(&store, EntityKind::Menu);

        let err = ancestry_ids(&mut source, 7).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = descendant_ids(&mut source, 7).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_tx_walk_sees_uncommitted_parent() {
        let store = menu_store(&[None, Some(1)]).await;
        let mut tx = store.begin().await.unwrap();
        let mut menu = Menu::new("m3");
        menu.parent_id = Some(2);
        let id = tx.insert(menu.into()).await.unwrap();

        let mut source = TxHierarchy::new(tx.as_mut(), EntityKind::Menu);
        assert_eq!(ancestry_ids(&mut source, id).await.unwrap(), vec![1, 2, 3]);
    }
}
