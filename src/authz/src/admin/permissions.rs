//! Permission administration

use super::{delete_with_edges, require_text, Page};
use crate::guard::IntegrityGuard;
use atlas_core::types::{Menu, Permission, PermissionId, Role};
use atlas_core::{
    EntityKind, Filter, Relation, RelationStore, Result, StoreExt, Transaction, TransactionExt,
};
use std::sync::Arc;
use tracing::info;

pub struct PermissionService {
    store: Arc<dyn RelationStore>,
    guard: IntegrityGuard,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            store,
            guard: IntegrityGuard::new(),
        }
    }

    pub async fn get(&self, id: PermissionId) -> Result<Permission> {
        self.store.require::<Permission>(id).await
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Permission>> {
        let permissions = self.store.list::<Permission>(&Filter::all()).await?;
        Ok(permissions.into_iter().find(|p| p.code.eq_ignore_ascii_case(code)))
    }

    /// Permissions ordered by code
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Page<Permission>> {
        let mut permissions = self.store.list::<Permission>(&Filter::all()).await?;
        permissions.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(Page::slice(permissions, offset, limit))
    }

    pub async fn create(&self, mut permission: Permission) -> Result<Permission> {
        require_text("permission code", &permission.code)?;

        let mut tx = self.store.begin().await?;
        self.guard
            .ensure_unique_code(tx.as_mut(), EntityKind::Permission, &Filter::all(), &permission.code, None)
            .await?;
        permission.id = tx.insert(permission.clone().into()).await?;
        tx.commit().await?;

        info!(permission = permission.id, code = %permission.code, "Created permission");
        Ok(permission)
    }

    pub async fn update(&self, id: PermissionId, mut permission: Permission) -> Result<Permission> {
        require_text("permission code", &permission.code)?;
        permission.id = id;

        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Permission, id).await?;
        self.guard
            .ensure_unique_code(tx.as_mut(), EntityKind::Permission, &Filter::all(), &permission.code, Some(id))
            .await?;
        tx.update(permission.clone().into()).await?;
        tx.commit().await?;

        info!(permission = id, code = %permission.code, "Updated permission");
        Ok(permission)
    }

    /// Delete a permission and every role grant and menu requirement naming it
    pub async fn delete(&self, id: PermissionId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let edges = delete_with_edges(tx.as_mut(), EntityKind::Permission, id).await?;
        tx.commit().await?;

        info!(permission = id, edges, "Deleted permission");
        Ok(())
    }

    /// Roles granting a permission, ordered by name
    pub async fn roles(&self, id: PermissionId) -> Result<Vec<Role>> {
        self.store.require::<Permission>(id).await?;

        let mut roles = Vec::new();
        for rid in self.store.get_inverse_edges(Relation::RolePermission, id).await? {
            if let Some(role) = self.store.fetch::<Role>(rid).await? {
                roles.push(role);
            }
        }
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    /// Menus requiring a permission, in display order
    pub async fn menus(&self, id: PermissionId) -> Result<Vec<Menu>> {
        self.store.require::<Permission>(id).await?;

        let mut menus = Vec::new();
        for mid in self.store.get_inverse_edges(Relation::MenuPermission, id).await? {
            if let Some(menu) = self.store.fetch::<Menu>(mid).await? {
                menus.push(menu);
            }
        }
        menus.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(menus)
    }
}
