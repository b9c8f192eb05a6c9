//! Replace-all relation synchronization
//!
//! One parametrized component serves every many-to-many edge set. A replace
//! runs delete-then-insert inside a single transaction: either the whole new
//! set is committed or the old set is left untouched.

use atlas_core::types::Id;
use atlas_core::{Relation, RelationStore, Result, Transaction, TransactionExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a replace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub relation: Relation,
    pub left: Id,
    /// Edges removed before inserting
    pub removed: usize,
    /// Right endpoints now linked, in request order
    pub linked: Vec<Id>,
}

/// Transactional edge-set writer
pub struct RelationSynchronizer {
    store: Arc<dyn RelationStore>,
}

impl RelationSynchronizer {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self { store }
    }

    /// Replace every edge of `left` with one edge per id in `rights`
    ///
    /// Duplicates in `rights` are ignored. An unknown `left` or right id
    /// fails with `NotFound` and nothing changes.
    pub async fn replace_edges(&self, relation: Relation, left: Id, rights: &[Id]) -> Result<SyncReport> {
        let mut tx = self.store.begin().await?;
        let report = replace_in(tx.as_mut(), relation, left, rights).await?;
        tx.commit().await?;

        info!(
            relation = %relation,
            left,
            removed = report.removed,
            linked = report.linked.len(),
            "Replaced edge set"
        );
        Ok(report)
    }

    /// Add a single edge; `false` if it was already present
    pub async fn add_edge(&self, relation: Relation, left: Id, right: Id) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(relation.left(), left).await?;
        tx.ensure_exists(relation.right(), right).await?;
        let added = tx.insert_edge(relation, left, right).await?;
        tx.commit().await?;

        debug!(relation = %relation, left, right, added, "Add edge");
        Ok(added)
    }

    /// Remove a single edge; `false` if it was not present
    pub async fn remove_edge(&self, relation: Relation, left: Id, right: Id) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(relation.left(), left).await?;
        let removed = tx.remove_edge(relation, left, right).await?;
        tx.commit().await?;

        debug!(relation = %relation, left, right, removed, "Remove edge");
        Ok(removed)
    }
}

/// Delete-then-insert on an already open transaction
///
/// The caller owns the transaction; on error it must not commit.
pub async fn replace_in(
    tx: &mut dyn Transaction,
    relation: Relation,
    left: Id,
    rights: &[Id],
) -> Result<SyncReport> {
    tx.ensure_exists(relation.left(), left).await?;

    let removed = tx.delete_edges(relation, left).await?;

    let mut seen = HashSet::with_capacity(rights.len());
    let mut linked = Vec::with_capacity(rights.len());
    for &right in rights {
        if !seen.insert(right) {
            continue;
        }
        tx.insert_edge(relation, left, right).await?;
        linked.push(right);
    }

    Ok(SyncReport {
        relation,
        left,
        removed,
        linked,
    })
}
