//! Integrity checks run inside a mutation's transaction
//!
//! Every check reads through the same [`Transaction`] the mutation will write
//! through, so validation and write share one boundary. Checks fail fast with
//! a named [`AtlasError`] and never write.

use crate::hierarchy::{ancestry_ids, TxHierarchy};
use atlas_core::types::{CountryId, Division, Id, RoleId};
use atlas_core::{AtlasError, EntityKind, Filter, Record, Relation, Result, Transaction};
use tracing::warn;

/// Structural invariant checks
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityGuard;

impl IntegrityGuard {
    pub fn new() -> Self {
        Self
    }

    /// Validate a proposed parent pointer and return the parent record
    ///
    /// `node` is `None` for a node that does not exist yet. Fails with
    /// `SelfParent` if the pointer targets the node itself, `NotFound` if the
    /// parent does not exist, and `CycleDetected` if the node is an ancestor
    /// of the proposed parent.
    pub async fn check_parent(
        &self,
        tx: &mut dyn Transaction,
        kind: EntityKind,
        node: Option<Id>,
        parent: Option<Id>,
    ) -> Result<Option<Record>> {
        let Some(parent) = parent else {
            return Ok(None);
        };

        if node == Some(parent) {
            return Err(AtlasError::SelfParent { kind, id: parent });
        }

        let record = tx
            .get_by_id(kind, parent)
            .await?
            .ok_or_else(|| AtlasError::not_found(kind, parent))?;

        if let Some(id) = node {
            let mut source = TxHierarchy::new(&mut *tx, kind);
            let path = ancestry_ids(&mut source, parent).await.map_err(|e| {
                if let AtlasError::CycleDetected { .. } = e {
                    warn!(kind = %kind, parent, "Existing hierarchy already contains a cycle");
                }
                e
            })?;
            if path.contains(&id) {
                return Err(AtlasError::CycleDetected { kind, id });
            }
        }

        Ok(Some(record))
    }

    /// [`check_parent`](Self::check_parent) for divisions, also requiring the
    /// parent to belong to the same country
    pub async fn check_division_parent(
        &self,
        tx: &mut dyn Transaction,
        division: &Division,
        node: Option<Id>,
    ) -> Result<Option<Division>> {
        let parent = self
            .check_parent(tx, EntityKind::Division, node, division.parent_id)
            .await?;

        match parent {
            Some(Record::Division(parent)) => {
                if parent.country_id != division.country_id {
                    return Err(AtlasError::InvalidParent {
                        kind: EntityKind::Division,
                        id: node,
                        parent: parent.id,
                    });
                }
                Ok(Some(parent))
            }
            _ => Ok(None),
        }
    }

    /// `HasChildren` unless the node is a leaf
    pub async fn ensure_no_children(
        &self,
        tx: &mut dyn Transaction,
        kind: EntityKind,
        id: Id,
    ) -> Result<()> {
        let children = tx.get_all(kind, &Filter::children_of(id)).await?.len();
        if children > 0 {
            return Err(AtlasError::HasChildren { kind, id, children });
        }
        Ok(())
    }

    /// `HasChildren` unless no record of `child_kind` matches `filter`
    ///
    /// Used for containment that is not a self-reference, such as countries
    /// under a continent or divisions under a country.
    pub async fn ensure_not_referenced(
        &self,
        tx: &mut dyn Transaction,
        kind: EntityKind,
        id: Id,
        child_kind: EntityKind,
        filter: &Filter,
    ) -> Result<()> {
        let children = tx.get_all(child_kind, filter).await?.len();
        if children > 0 {
            return Err(AtlasError::HasChildren { kind, id, children });
        }
        Ok(())
    }

    /// `HasMembers` if any user holds the role
    pub async fn ensure_no_members(&self, tx: &mut dyn Transaction, role: RoleId) -> Result<()> {
        let members = tx.get_inverse_edges(Relation::UserRole, role).await?.len();
        if members > 0 {
            return Err(AtlasError::HasMembers { role, members });
        }
        Ok(())
    }

    /// `DuplicateCode` if another record in `scope` carries `code`
    ///
    /// Codes compare case-insensitively.
    pub async fn ensure_unique_code(
        &self,
        tx: &mut dyn Transaction,
        kind: EntityKind,
        scope: &Filter,
        code: &str,
        exclude: Option<Id>,
    ) -> Result<()> {
        let taken = tx
            .get_all(kind, scope)
            .await?
            .iter()
            .filter(|r| Some(r.id()) != exclude)
            .any(|r| record_codes(r).iter().any(|c| c.eq_ignore_ascii_case(code)));

        if taken {
            return Err(AtlasError::DuplicateCode {
                kind,
                code: code.to_string(),
            });
        }
        Ok(())
    }

    /// `DuplicateName` if another record of the kind carries `name`
    ///
    /// Names compare case-insensitively.
    pub async fn ensure_unique_name(
        &self,
        tx: &mut dyn Transaction,
        kind: EntityKind,
        name: &str,
        exclude: Option<Id>,
    ) -> Result<()> {
        let taken = tx
            .get_all(kind, &Filter::all())
            .await?
            .iter()
            .filter(|r| Some(r.id()) != exclude)
            .any(|r| r.label().eq_ignore_ascii_case(name));

        if taken {
            return Err(AtlasError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// `NotFound` if the division type is missing, `InvalidInput` if it
    /// belongs to another country
    pub async fn check_division_type(
        &self,
        tx: &mut dyn Transaction,
        division_type: Id,
        country: CountryId,
    ) -> Result<()> {
        match tx.get_by_id(EntityKind::DivisionType, division_type).await? {
            Some(record) if record.country_id() == Some(country) => Ok(()),
            Some(_) => Err(AtlasError::invalid(format!(
                "division type {} does not belong to country {}",
                division_type, country
            ))),
            None => Err(AtlasError::not_found(EntityKind::DivisionType, division_type)),
        }
    }
}

/// Unique codes a record carries
fn record_codes(record: &Record) -> Vec<&str> {
    match record {
        Record::Permission(p) => vec![p.code.as_str()],
        Record::Continent(c) => vec![c.code.as_str()],
        Record::Country(c) => vec![c.iso_alpha2.as_str(), c.iso_alpha3.as_str()],
        Record::Division(d) => vec![d.code.as_str()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRelationStore;
    use atlas_core::types::{Menu, Permission, Role, User};
    use atlas_core::RelationStore;

    async fn menu_chain(store: &InMemoryRelationStore) -> (Id, Id, Id) {
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert(Menu::new("A").into()).await.unwrap();
        let b = tx.insert(Menu::new("B").with_parent(a).into()).await.unwrap();
        let c = tx.insert(Menu::new("C").with_parent(b).into()).await.unwrap();
        tx.commit().await.unwrap();
        (a, b, c)
    }

    #[tokio::test]
    async fn test_self_parent() {
        let store = InMemoryRelationStore::new();
        let (a, _, _) = menu_chain(&store).await;
        let mut tx = store.begin().await.unwrap();

        let err = IntegrityGuard
            .check_parent(tx.as_mut(), EntityKind::Menu, Some(a), Some(a))
            .await
            .unwrap_err();
        assert_eq!(err, AtlasError::SelfParent { kind: EntityKind::Menu, id: a });
    }

    #[tokio::test]
    async fn test_reparent_under_descendant() {
        let store = InMemoryRelationStore::new();
        let (a, b, c) = menu_chain(&store).await;
        let mut tx = store.begin().await.unwrap();
        let guard = IntegrityGuard::new();

        let err = guard
            .check_parent(tx.as_mut(), EntityKind::Menu, Some(a), Some(c))
            .await
            .unwrap_err();
        assert_eq!(err, AtlasError::CycleDetected { kind: EntityKind::Menu, id: a });

        let parent = guard
            .check_parent(tx.as_mut(), EntityKind::Menu, Some(c), Some(a))
            .await
            .unwrap();
        assert_eq!(parent.map(|r| r.id()), Some(a));

        let missing = guard
            .check_parent(tx.as_mut(), EntityKind::Menu, Some(b), Some(999))
            .await
            .unwrap_err();
        assert_eq!(missing, AtlasError::not_found(EntityKind::Menu, 999));
    }

    #[tokio::test]
    async fn test_children_and_members() {
        let store = InMemoryRelationStore::new();
        let (a, _, c) = menu_chain(&store).await;
        let mut tx = store.begin().await.unwrap();
        let guard = IntegrityGuard::new();

        assert!(matches!(
            guard.ensure_no_children(tx.as_mut(), EntityKind::Menu, a).await,
            Err(AtlasError::HasChildren { children: 1, .. })
        ));
        assert!(guard.ensure_no_children(tx.as_mut(), EntityKind::Menu, c).await.is_ok());

        let role = tx.insert(Role::new("VIEWER").into()).await.unwrap();
        let user = tx.insert(User::new("u1").into()).await.unwrap();
        assert!(guard.ensure_no_members(tx.as_mut(), role).await.is_ok());

        tx.insert_edge(Relation::UserRole, user, role).await.unwrap();
        assert_eq!(
            guard.ensure_no_members(tx.as_mut(), role).await.unwrap_err(),
            AtlasError::HasMembers { role, members: 1 }
        );
    }

    #[tokio::test]
    async fn test_division_parent_in_other_country() {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();
        let guard = IntegrityGuard::new();

        let foreign = tx
            .insert(Division::new(2, 20, "Lima", "LIM").into())
            .await
            .unwrap();
        let local = tx
            .insert(Division::new(1, 10, "Antioquia", "ANT").into())
            .await
            .unwrap();

        let new_division = Division::new(1, 10, "Medellin", "MED").with_parent(foreign);
        let err = guard
            .check_division_parent(tx.as_mut(), &new_division, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AtlasError::InvalidParent {
                kind: EntityKind::Division,
                id: None,
                parent: foreign,
            }
        );

        let moved = Division::new(1, 10, "Antioquia", "ANT").with_parent(foreign);
        let err = guard
            .check_division_parent(tx.as_mut(), &moved, Some(local))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AtlasError::InvalidParent {
                kind: EntityKind::Division,
                id: Some(local),
                parent: foreign,
            }
        );
    }

    #[tokio::test]
    async fn test_unique_code_and_name() {
        let store = InMemoryRelationStore::new();
        let mut tx = store.begin().await.unwrap();
        let guard = IntegrityGuard::new();

        let id = tx.insert(Permission::new("MENUS_VER").into()).await.unwrap();
        tx.insert(Role::new("ADMIN").into()).await.unwrap();

        let err = guard
            .ensure_unique_code(tx.as_mut(), EntityKind::Permission, &Filter::all(), "menus_ver", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), atlas_core::ErrorKind::DuplicateCode);

        // Renaming a record to its own code is fine
        guard
            .ensure_unique_code(tx.as_mut(), EntityKind::Permission, &Filter::all(), "MENUS_VER", Some(id))
            .await
            .unwrap();

        let err = guard
            .ensure_unique_name(tx.as_mut(), EntityKind::Role, "Admin", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), atlas_core::ErrorKind::DuplicateName);
    }
}
