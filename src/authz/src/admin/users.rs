//! User identities and role assignment
//!
//! Credentials are handled by the external credential layer; this service
//! only manages the identity records the authorization graph hangs off.

use super::{delete_with_edges, require_text};
use crate::guard::IntegrityGuard;
use crate::sync::{RelationSynchronizer, SyncReport};
use atlas_core::types::{Role, RoleId, User, UserId};
use atlas_core::{
    EntityKind, Filter, Relation, RelationStore, Result, StoreExt, Transaction, TransactionExt,
};
use std::sync::Arc;
use tracing::info;

pub struct UserService {
    store: Arc<dyn RelationStore>,
    guard: IntegrityGuard,
    sync: RelationSynchronizer,
}

impl UserService {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            sync: RelationSynchronizer::new(store.clone()),
            store,
            guard: IntegrityGuard::new(),
        }
    }

    pub async fn get(&self, id: UserId) -> Result<User> {
        self.store.require::<User>(id).await
    }

    /// Users ordered by username
    pub async fn list(&self, filter: &Filter) -> Result<Vec<User>> {
        let mut users = self.store.list::<User>(filter).await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    pub async fn create(&self, mut user: User) -> Result<User> {
        require_text("username", &user.username)?;

        let mut tx = self.store.begin().await?;
        self.guard
            .ensure_unique_name(tx.as_mut(), EntityKind::User, &user.username, None)
            .await?;
        user.id = tx.insert(user.clone().into()).await?;
        tx.commit().await?;

        info!(user = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    pub async fn update(&self, id: UserId, mut user: User) -> Result<User> {
        require_text("username", &user.username)?;
        user.id = id;

        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::User, id).await?;
        self.guard
            .ensure_unique_name(tx.as_mut(), EntityKind::User, &user.username, Some(id))
            .await?;
        tx.update(user.clone().into()).await?;
        tx.commit().await?;

        info!(user = id, "Updated user");
        Ok(user)
    }

    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let mut user = tx.require::<User>(id).await?;
        user.active = active;
        tx.update(user.clone().into()).await?;
        tx.commit().await?;

        info!(user = id, active, "Changed user activation");
        Ok(user)
    }

    /// Delete a user with its role assignments and menu overrides
    pub async fn delete(&self, id: UserId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let edges = delete_with_edges(tx.as_mut(), EntityKind::User, id).await?;
        tx.commit().await?;

        info!(user = id, edges, "Deleted user");
        Ok(())
    }

    /// Roles assigned to a user, ordered by name
    pub async fn roles(&self, id: UserId) -> Result<Vec<Role>> {
        self.store.require::<User>(id).await?;

        let mut roles = Vec::new();
        for rid in self.store.get_edges(Relation::UserRole, id).await? {
            if let Some(role) = self.store.fetch::<Role>(rid).await? {
                roles.push(role);
            }
        }
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    /// Replace every role assignment of a user
    pub async fn sync_roles(&self, id: UserId, roles: &[RoleId]) -> Result<SyncReport> {
        self.sync.replace_edges(Relation::UserRole, id, roles).await
    }

    pub async fn assign_role(&self, id: UserId, role: RoleId) -> Result<bool> {
        self.sync.add_edge(Relation::UserRole, id, role).await
    }

    pub async fn remove_role(&self, id: UserId, role: RoleId) -> Result<bool> {
        self.sync.remove_edge(Relation::UserRole, id, role).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRelationStore;
    use atlas_core::types::{Menu, MenuOverride};
    use atlas_core::ErrorKind;

    #[tokio::test]
    async fn test_role_assignment() {
        let store = Arc::new(InMemoryRelationStore::new());
        let users = UserService::new(store.clone());

        let mut tx = store.begin().await.unwrap();
        let viewer = tx.insert(Role::new("VIEWER").into()).await.unwrap();
        let admin = tx.insert(Role::new("ADMIN").into()).await.unwrap();
        tx.commit().await.unwrap();

        let u = users.create(User::new("ana").with_email("ana@example.com")).await.unwrap();
        users.sync_roles(u.id, &[viewer, admin]).await.unwrap();

        let names: Vec<String> = users.roles(u.id).await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["ADMIN", "VIEWER"]);

        assert!(users.remove_role(u.id, admin).await.unwrap());
        assert!(!users.assign_role(u.id, viewer).await.unwrap());
        assert_eq!(users.roles(u.id).await.unwrap().len(), 1);

        assert_eq!(
            users.assign_role(u.id, 99).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_usernames_unique_and_delete_cascades() {
        let store = Arc::new(InMemoryRelationStore::new());
        let users = UserService::new(store.clone());
        let u = users.create(User::new("ana")).await.unwrap();

        assert_eq!(
            users.create(User::new("ANA")).await.unwrap_err().kind(),
            ErrorKind::DuplicateName
        );

        let mut tx = store.begin().await.unwrap();
        let menu = tx.insert(Menu::new("Reports").into()).await.unwrap();
        tx.put_override(MenuOverride::deny(menu, u.id)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!users.set_active(u.id, false).await.unwrap().active);
        assert!(users.list(&Filter::all().active_only()).await.unwrap().is_empty());

        users.delete(u.id).await.unwrap();
        assert!(store.overrides_for_user(u.id).await.unwrap().is_empty());
    }
}
