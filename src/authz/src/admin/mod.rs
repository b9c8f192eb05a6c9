//! Administrative write and listing services
//!
//! Each mutation opens one transaction, runs the [`IntegrityGuard`] checks
//! through it, writes, and commits. A failed check returns before anything is
//! written and the dropped transaction discards whatever was staged.
//!
//! [`IntegrityGuard`]: crate::guard::IntegrityGuard

pub mod menus;
pub mod permissions;
pub mod roles;
pub mod territories;
pub mod users;

pub use menus::MenuService;
pub use permissions::PermissionService;
pub use roles::RoleService;
pub use territories::{CountryStructure, DivisionDetail, DivisionStats, TerritoryService};
pub use users::UserService;

use crate::hierarchy::{descendant_ids, TxHierarchy};
use atlas_core::types::Id;
use atlas_core::{AtlasError, EntityKind, Record, Relation, Result, Transaction, TransactionExt};
use serde::Serialize;

/// One page of an ordered listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole listing
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Cut a page out of an already ordered listing
    pub fn slice(all: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(offset).take(limit).collect();
        Self {
            items,
            total,
            offset,
            limit,
        }
    }
}

/// `InvalidInput` if a required text field is blank
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AtlasError::invalid(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Add `delta` to the level of every node below `root`
///
/// Returns how many nodes were rewritten.
pub(crate) async fn shift_subtree_levels(
    tx: &mut dyn Transaction,
    kind: EntityKind,
    root: Id,
    delta: i32,
) -> Result<usize> {
    if delta == 0 {
        return Ok(0);
    }

    let below = {
        let mut source = TxHierarchy::new(&mut *tx, kind);
        descendant_ids(&mut source, root).await?
    };

    for id in &below {
        let mut record = tx
            .get_by_id(kind, *id)
            .await?
            .ok_or_else(|| AtlasError::not_found(kind, *id))?;
        match &mut record {
            Record::Menu(menu) => menu.level += delta,
            Record::Division(division) => division.level += delta,
            _ => {}
        }
        tx.update(record).await?;
    }

    Ok(below.len())
}

/// Remove a record together with its edges and overrides
pub(crate) async fn delete_with_edges(
    tx: &mut dyn Transaction,
    kind: EntityKind,
    id: Id,
) -> Result<usize> {
    tx.ensure_exists(kind, id).await?;

    let mut removed = 0;
    for relation in Relation::ALL {
        if relation.left() == kind {
            removed += tx.delete_edges(relation, id).await?;
        }
        if relation.right() == kind {
            removed += tx.delete_inverse_edges(relation, id).await?;
        }
    }
    removed += tx.clear_overrides(kind, id).await?;

    tx.delete(kind, id).await?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slice() {
        let page = Page::slice((1..=12).collect::<Vec<_>>(), 5, 5);
        assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.total, 12);

        let tail = Page::slice((1..=12).collect::<Vec<_>>(), 10, 5);
        assert_eq!(tail.items, vec![11, 12]);

        let past = Page::slice((1..=3).collect::<Vec<_>>(), 10, 5);
        assert!(past.items.is_empty());
        assert_eq!(past.total, 3);
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("name", "Admin").is_ok());
        assert!(require_text("name", "   ").is_err());
    }
}
