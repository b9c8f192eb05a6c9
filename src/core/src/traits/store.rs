//! Relation store traits
//!
//! The persistence seam of the core. A [`RelationStore`] serves consistent
//! reads and opens [`Transaction`]s; every mutation goes through a
//! transaction so that validation and writes share one boundary.

use crate::error::{AtlasError, Result};
use crate::types::{Entity, EntityKind, Filter, Id, MenuId, MenuOverride, Record, Relation, UserId};
use async_trait::async_trait;

/// Read access plus transaction factory
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Get an entity by kind and id
    async fn get_by_id(&self, kind: EntityKind, id: Id) -> Result<Option<Record>>;

    /// List entities of a kind matching the filter, in id order
    async fn get_all(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Record>>;

    /// Right endpoints of every edge whose left endpoint is `left`
    async fn get_edges(&self, relation: Relation, left: Id) -> Result<Vec<Id>>;

    /// Left endpoints of every edge whose right endpoint is `right`
    async fn get_inverse_edges(&self, relation: Relation, right: Id) -> Result<Vec<Id>>;

    /// Every `(left, right)` edge of a relation
    async fn all_edges(&self, relation: Relation) -> Result<Vec<(Id, Id)>>;

    /// Explicit menu overrides recorded for a user
    async fn overrides_for_user(&self, user: UserId) -> Result<Vec<MenuOverride>>;

    /// Open a transaction; nothing it writes is visible until `commit`
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// An all-or-nothing unit of work
///
/// Every read sees one consistent state: the transaction's own writes on top
/// of what was committed when it began. Dropping a transaction without
/// committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    async fn get_by_id(&mut self, kind: EntityKind, id: Id) -> Result<Option<Record>>;

    async fn get_all(&mut self, kind: EntityKind, filter: &Filter) -> Result<Vec<Record>>;

    async fn get_edges(&mut self, relation: Relation, left: Id) -> Result<Vec<Id>>;

    async fn get_inverse_edges(&mut self, relation: Relation, right: Id) -> Result<Vec<Id>>;

    async fn all_edges(&mut self, relation: Relation) -> Result<Vec<(Id, Id)>>;

    async fn overrides_for_user(&mut self, user: UserId) -> Result<Vec<MenuOverride>>;

    /// Insert a record, assigning a fresh id; returns the id
    async fn insert(&mut self, record: Record) -> Result<Id>;

    /// Replace an existing record; `NotFound` if absent
    async fn update(&mut self, record: Record) -> Result<()>;

    /// Delete a record; `NotFound` if absent
    async fn delete(&mut self, kind: EntityKind, id: Id) -> Result<()>;

    /// Remove every edge with the given left endpoint; returns how many
    async fn delete_edges(&mut self, relation: Relation, left: Id) -> Result<usize>;

    /// Remove every edge with the given right endpoint; returns how many
    async fn delete_inverse_edges(&mut self, relation: Relation, right: Id) -> Result<usize>;

    /// Insert one edge; `false` if it already existed, `NotFound` if either
    /// endpoint does not exist
    async fn insert_edge(&mut self, relation: Relation, left: Id, right: Id) -> Result<bool>;

    /// Remove one edge; `false` if it did not exist
    async fn remove_edge(&mut self, relation: Relation, left: Id, right: Id) -> Result<bool>;

    /// Upsert an explicit menu override; `NotFound` if menu or user is missing
    async fn put_override(&mut self, entry: MenuOverride) -> Result<()>;

    /// Remove an explicit menu override; `false` if none was recorded
    async fn remove_override(&mut self, menu: MenuId, user: UserId) -> Result<bool>;

    /// Remove every override naming the entity (a menu or a user)
    async fn clear_overrides(&mut self, kind: EntityKind, id: Id) -> Result<usize>;

    /// Publish every write made in this transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write made in this transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Typed helpers over [`RelationStore`]
#[async_trait]
pub trait StoreExt: RelationStore {
    async fn fetch<E: Entity>(&self, id: Id) -> Result<Option<E>> {
        Ok(self.get_by_id(E::KIND, id).await?.and_then(E::from_record))
    }

    async fn require<E: Entity>(&self, id: Id) -> Result<E> {
        self.fetch::<E>(id)
            .await?
            .ok_or_else(|| AtlasError::not_found(E::KIND, id))
    }

    async fn list<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>> {
        let records = self.get_all(E::KIND, filter).await?;
        Ok(records.into_iter().filter_map(E::from_record).collect())
    }
}

impl<S: RelationStore + ?Sized> StoreExt for S {}

/// Typed helpers over [`Transaction`]
#[async_trait]
pub trait TransactionExt: Transaction {
    async fn fetch<E: Entity>(&mut self, id: Id) -> Result<Option<E>> {
        Ok(self.get_by_id(E::KIND, id).await?.and_then(E::from_record))
    }

    async fn require<E: Entity>(&mut self, id: Id) -> Result<E> {
        self.fetch::<E>(id)
            .await?
            .ok_or_else(|| AtlasError::not_found(E::KIND, id))
    }

    async fn list<E: Entity>(&mut self, filter: &Filter) -> Result<Vec<E>> {
        let records = self.get_all(E::KIND, filter).await?;
        Ok(records.into_iter().filter_map(E::from_record).collect())
    }

    async fn exists(&mut self, kind: EntityKind, id: Id) -> Result<bool> {
        Ok(self.get_by_id(kind, id).await?.is_some())
    }

    /// `NotFound` unless the entity exists
    async fn ensure_exists(&mut self, kind: EntityKind, id: Id) -> Result<()> {
        if self.exists(kind, id).await? {
            Ok(())
        } else {
            Err(AtlasError::not_found(kind, id))
        }
    }
}

impl<T: Transaction + ?Sized> TransactionExt for T {}
