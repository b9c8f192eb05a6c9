//! In-memory relation store
//!
//! A transaction takes the write lock for its whole lifetime and works on a
//! private copy of the tables. `commit` swaps the copy in; dropping the
//! transaction discards it. Readers therefore never observe a half-applied
//! write.
//!
//! While a transaction is open, reads on the store itself wait for it to
//! finish. Code holding a transaction must read through the transaction.

use async_trait::async_trait;
use atlas_core::types::{EntityKind, Filter, Id, MenuId, MenuOverride, Record, Relation, UserId};
use atlas_core::{AtlasError, RelationStore, Result, Transaction};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Tables {
    records: HashMap<EntityKind, BTreeMap<Id, Record>>,
    edges: HashMap<Relation, BTreeSet<(Id, Id)>>,
    overrides: BTreeMap<(MenuId, UserId), bool>,
    last_id: HashMap<EntityKind, Id>,
}

impl Tables {
    fn get(&self, kind: EntityKind, id: Id) -> Option<&Record> {
        self.records.get(&kind).and_then(|rows| rows.get(&id))
    }

    fn contains(&self, kind: EntityKind, id: Id) -> bool {
        self.get(kind, id).is_some()
    }

    fn select(&self, kind: EntityKind, filter: &Filter) -> Vec<Record> {
        self.records
            .get(&kind)
            .map(|rows| rows.values().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default()
    }

    fn edges_from(&self, relation: Relation, left: Id) -> Vec<Id> {
        self.edges
            .get(&relation)
            .map(|set| {
                set.range((left, Id::MIN)..=(left, Id::MAX))
                    .map(|&(_, right)| right)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn edges_to(&self, relation: Relation, right: Id) -> Vec<Id> {
        self.edges
            .get(&relation)
            .map(|set| {
                set.iter()
                    .filter(|&&(_, r)| r == right)
                    .map(|&(left, _)| left)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all_edges(&self, relation: Relation) -> Vec<(Id, Id)> {
        self.edges
            .get(&relation)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn overrides_for(&self, user: UserId) -> Vec<MenuOverride> {
        self.overrides
            .iter()
            .filter(|((_, u), _)| *u == user)
            .map(|(&(menu_id, user_id), &allowed)| MenuOverride {
                menu_id,
                user_id,
                allowed,
            })
            .collect()
    }

    fn require(&self, kind: EntityKind, id: Id) -> Result<()> {
        if self.contains(kind, id) {
            Ok(())
        } else {
            Err(AtlasError::not_found(kind, id))
        }
    }
}

/// Relation store kept entirely in process memory
#[derive(Debug, Clone)]
pub struct InMemoryRelationStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRelationStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }

    /// Number of stored records of a kind
    pub async fn count(&self, kind: EntityKind) -> usize {
        let tables = self.tables.read().await;
        tables.records.get(&kind).map_or(0, BTreeMap::len)
    }
}

impl Default for InMemoryRelationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationStore for InMemoryRelationStore {
    async fn get_by_id(&self, kind: EntityKind, id: Id) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables.get(kind, id).cloned())
    }

    async fn get_all(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        Ok(tables.select(kind, filter))
    }

    async fn get_edges(&self, relation: Relation, left: Id) -> Result<Vec<Id>> {
        let tables = self.tables.read().await;
        Ok(tables.edges_from(relation, left))
    }

    async fn get_inverse_edges(&self, relation: Relation, right: Id) -> Result<Vec<Id>> {
        let tables = self.tables.read().await;
        Ok(tables.edges_to(relation, right))
    }

    async fn all_edges(&self, relation: Relation) -> Result<Vec<(Id, Id)>> {
        let tables = self.tables.read().await;
        Ok(tables.all_edges(relation))
    }

    async fn overrides_for_user(&self, user: UserId) -> Result<Vec<MenuOverride>> {
        let tables = self.tables.read().await;
        Ok(tables.overrides_for(user))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.tables.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

/// Exclusive unit of work over an [`InMemoryRelationStore`]
pub struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn get_by_id(&mut self, kind: EntityKind, id: Id) -> Result<Option<Record>> {
        Ok(self.working.get(kind, id).cloned())
    }

    async fn get_all(&mut self, kind: EntityKind, filter: &Filter) -> Result<Vec<Record>> {
        Ok(self.working.select(kind, filter))
    }

    async fn get_edges(&mut self, relation: Relation, left: Id) -> Result<Vec<Id>> {
        Ok(self.working.edges_from(relation, left))
    }

    async fn get_inverse_edges(&mut self, relation: Relation, right: Id) -> Result<Vec<Id>> {
        Ok(self.working.edges_to(relation, right))
    }

    async fn all_edges(&mut self, relation: Relation) -> Result<Vec<(Id, Id)>> {
        Ok(self.working.all_edges(relation))
    }

    async fn overrides_for_user(&mut self, user: UserId) -> Result<Vec<MenuOverride>> {
        Ok(self.working.overrides_for(user))
    }

    async fn insert(&mut self, mut record: Record) -> Result<Id> {
        let kind = record.kind();
        let last = self.working.last_id.entry(kind).or_insert(0);
        *last += 1;
        let id = *last;

        record.set_id(id);
        self.working.records.entry(kind).or_default().insert(id, record);
        Ok(id)
    }

    async fn update(&mut self, record: Record) -> Result<()> {
        let (kind, id) = (record.kind(), record.id());
        match self.working.records.get_mut(&kind).and_then(|rows| rows.get_mut(&id)) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(AtlasError::not_found(kind, id)),
        }
    }

    async fn delete(&mut self, kind: EntityKind, id: Id) -> Result<()> {
        self.working
            .records
            .get_mut(&kind)
            .and_then(|rows| rows.remove(&id))
            .map(|_| ())
            .ok_or_else(|| AtlasError::not_found(kind, id))
    }

    async fn delete_edges(&mut self, relation: Relation, left: Id) -> Result<usize> {
        let Some(set) = self.working.edges.get_mut(&relation) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|&(l, _)| l != left);
        Ok(before - set.len())
    }

    async fn delete_inverse_edges(&mut self, relation: Relation, right: Id) -> Result<usize> {
        let Some(set) = self.working.edges.get_mut(&relation) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|&(_, r)| r != right);
        Ok(before - set.len())
    }

    async fn insert_edge(&mut self, relation: Relation, left: Id, right: Id) -> Result<bool> {
        self.working.require(relation.left(), left)?;
        self.working.require(relation.right(), right)?;
        Ok(self.working.edges.entry(relation).or_default().insert((left, right)))
    }

    async fn remove_edge(&mut self, relation: Relation, left: Id, right: Id) -> Result<bool> {
        Ok(self
            .working
            .edges
            .get_mut(&relation)
            .is_some_and(|set| set.remove(&(left, right))))
    }

    async fn put_override(&mut self, entry: MenuOverride) -> Result<()> {
        self.working.require(EntityKind::Menu, entry.menu_id)?;
        self.working.require(EntityKind::User, entry.user_id)?;
        self.working
            .overrides
            .insert((entry.menu_id, entry.user_id), entry.allowed);
        Ok(())
    }

    async fn remove_override(&mut self, menu: MenuId, user: UserId) -> Result<bool> {
        Ok(self.working.overrides.remove(&(menu, user)).is_some())
    }

    async fn clear_overrides(&mut self, kind: EntityKind, id: Id) -> Result<usize> {
        let before = self.working.overrides.len();
        match kind {
            EntityKind::Menu => self.working.overrides.retain(|&(m, _), _| m != id),
            EntityKind::User => self.working.overrides.retain(|&(_, u), _| u != id),
            _ => {}
        }
        Ok(before - self.working.overrides.len())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        debug!("Committed in-memory transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        debug!("Rolled back in-memory transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::types::{Menu, Permission, Role, User};
    use atlas_core::StoreExt;

    #[tokio::test]
    async fn test_insert_assigns_ids_per_kind() {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();

        assert_eq!(tx.insert(Role::new("A").into()).await.unwrap(), 1);
        assert_eq!(tx.insert(Role::new("B").into()).await.unwrap(), 2);
        assert_eq!(tx.insert(Permission::new("P").into()).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let role: Role = store.require(2).await.unwrap();
        assert_eq!(role.name, "B");
        assert_eq!(store.count(EntityKind::Role).await, 2);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryRelationStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(Role::new("A").into()).await.unwrap();
        }
        assert_eq!(store.count(EntityKind::Role).await, 0);

        let mut tx = store.begin().await.unwrap();
        tx.insert(Role::new("A").into()).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.count(EntityKind::Role).await, 0);
    }

    #[tokio::test]
    async fn test_edges_require_both_endpoints() {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();
        let role = tx.insert(Role::new("A").into()).await.unwrap();
        let permission = tx.insert(Permission::new("P").into()).await.unwrap();

        assert!(tx.insert_edge(Relation::RolePermission, role, permission).await.unwrap());
        assert!(!tx.insert_edge(Relation::RolePermission, role, permission).await.unwrap());

        let err = tx
            .insert_edge(Relation::RolePermission, role, 42)
            .await
            .unwrap_err();
        assert_eq!(err, AtlasError::not_found(EntityKind::Permission, 42));
        tx.commit().await.unwrap();

        assert_eq!(store.get_edges(Relation::RolePermission, role).await.unwrap(), vec![permission]);
        assert_eq!(
            store.get_inverse_edges(Relation::RolePermission, permission).await.unwrap(),
            vec![role]
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut menu = Menu::new("Ghost");
        menu.id = 5;
        assert!(tx.update(menu.into()).await.is_err());
        assert_eq!(
            tx.delete(EntityKind::Menu, 5).await.unwrap_err(),
            AtlasError::not_found(EntityKind::Menu, 5)
        );
    }

    #[tokio::test]
    async fn test_overrides() {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();
        let menu = tx.insert(Menu::new("M").into()).await.unwrap();
        let user = tx.insert(User::new("u").into()).await.unwrap();

        tx.put_override(MenuOverride::allow(menu, user)).await.unwrap();
        tx.put_override(MenuOverride::deny(menu, user)).await.unwrap();
        assert!(tx.put_override(MenuOverride::deny(99, user)).await.is_err());
        tx.commit().await.unwrap();

        assert_eq!(
            store.overrides_for_user(user).await.unwrap(),
            vec![MenuOverride::deny(menu, user)]
        );

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.clear_overrides(EntityKind::User, user).await.unwrap(), 1);
        assert!(!tx.remove_override(menu, user).await.unwrap());
        tx.commit().await.unwrap();
        assert!(store.overrides_for_user(user).await.unwrap().is_empty());
    }
}
