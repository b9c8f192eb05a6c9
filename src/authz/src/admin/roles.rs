//! Role administration

use super::{delete_with_edges, require_text, Page};
use crate::guard::IntegrityGuard;
use crate::sync::{RelationSynchronizer, SyncReport};
use atlas_core::types::{Permission, PermissionId, Role, RoleId, User};
use atlas_core::{
    EntityKind, Filter, Relation, RelationStore, Result, StoreExt, Transaction, TransactionExt,
};
use std::sync::Arc;
use tracing::info;

pub struct RoleService {
    store: Arc<dyn RelationStore>,
    guard: IntegrityGuard,
    sync: RelationSynchronizer,
}

impl RoleService {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            sync: RelationSynchronizer::new(store.clone()),
            store,
            guard: IntegrityGuard::new(),
        }
    }

    pub async fn get(&self, id: RoleId) -> Result<Role> {
        self.store.require::<Role>(id).await
    }

    /// Look a role up by its unique name (case-insensitive)
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let roles = self.store.list::<Role>(&Filter::all()).await?;
        Ok(roles.into_iter().find(|r| r.name.eq_ignore_ascii_case(name)))
    }

    /// Roles ordered by name
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Page<Role>> {
        let mut roles = self.store.list::<Role>(&Filter::all()).await?;
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Page::slice(roles, offset, limit))
    }

    pub async fn create(&self, mut role: Role) -> Result<Role> {
        require_text("role name", &role.name)?;

        let mut tx = self.store.begin().await?;
        self.guard
            .ensure_unique_name(tx.as_mut(), EntityKind::Role, &role.name, None)
            .await?;
        role.id = tx.insert(role.clone().into()).await?;
        tx.commit().await?;

        info!(role = role.id, name = %role.name, "Created role");
        Ok(role)
    }

    pub async fn update(&self, id: RoleId, mut role: Role) -> Result<Role> {
        require_text("role name", &role.name)?;
        role.id = id;

        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Role, id).await?;
        self.guard
            .ensure_unique_name(tx.as_mut(), EntityKind::Role, &role.name, Some(id))
            .await?;
        tx.update(role.clone().into()).await?;
        tx.commit().await?;

        info!(role = id, name = %role.name, "Updated role");
        Ok(role)
    }

    /// Delete a role no user holds, along with its permission grants
    pub async fn delete(&self, id: RoleId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Role, id).await?;
        self.guard.ensure_no_members(tx.as_mut(), id).await?;
        let edges = delete_with_edges(tx.as_mut(), EntityKind::Role, id).await?;
        tx.commit().await?;

        info!(role = id, edges, "Deleted role");
        Ok(())
    }

    /// Permissions granted by a role, ordered by code
    pub async fn permissions(&self, id: RoleId) -> Result<Vec<Permission>> {
        self.store.require::<Role>(id).await?;

        let mut permissions = Vec::new();
        for pid in self.store.get_edges(Relation::RolePermission, id).await? {
            if let Some(permission) = self.store.fetch::<Permission>(pid).await? {
                permissions.push(permission);
            }
        }
        permissions.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(permissions)
    }

    /// Users holding a role, ordered by username
    pub async fn members(&self, id: RoleId) -> Result<Vec<User>> {
        self.store.require::<Role>(id).await?;

        let mut users = Vec::new();
        for uid in self.store.get_inverse_edges(Relation::UserRole, id).await? {
            if let Some(user) = self.store.fetch::<User>(uid).await? {
                users.push(user);
            }
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    /// Replace every permission grant of a role
    pub async fn sync_permissions(&self, id: RoleId, permissions: &[PermissionId]) -> Result<SyncReport> {
        self.sync
            .replace_edges(Relation::RolePermission, id, permissions)
            .await
    }

    pub async fn grant_permission(&self, id: RoleId, permission: PermissionId) -> Result<bool> {
        self.sync.add_edge(Relation::RolePermission, id, permission).await
    }

    pub async fn revoke_permission(&self, id: RoleId, permission: PermissionId) -> Result<bool> {
        self.sync.remove_edge(Relation::RolePermission, id, permission).await
    }
}
