//! Engine facade wiring the resolver, synchronizer and admin services to one
//! relation store

use crate::admin::{MenuService, PermissionService, RoleService, TerritoryService, UserService};
use crate::config::EngineConfig;
use crate::hierarchy::TreeNode;
use crate::permissions::PermissionResolver;
use crate::store::InMemoryRelationStore;
use crate::sync::{RelationSynchronizer, SyncReport};
use atlas_core::types::{Id, Menu, UserId};
use atlas_core::{Relation, RelationStore, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Access-control and taxonomy engine over a shared relation store
pub struct AtlasEngine {
    store: Arc<dyn RelationStore>,
    config: EngineConfig,
    resolver: PermissionResolver,
    sync: RelationSynchronizer,
    menus: MenuService,
    roles: RoleService,
    permissions: PermissionService,
    users: UserService,
    territories: TerritoryService,
}

impl AtlasEngine {
    /// Engine over a fresh in-memory store with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine over a fresh in-memory store
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryRelationStore::new()))
    }

    /// Engine over a caller-supplied store
    pub fn with_store(config: EngineConfig, store: Arc<dyn RelationStore>) -> Self {
        info!(
            admin_role = %config.admin_role,
            empty_requirement_policy = ?config.empty_requirement_policy,
            "Initializing engine"
        );

        Self {
            resolver: PermissionResolver::new(store.clone(), config.clone()),
            sync: RelationSynchronizer::new(store.clone()),
            menus: MenuService::new(store.clone(), config.clone()),
            roles: RoleService::new(store.clone()),
            permissions: PermissionService::new(store.clone()),
            users: UserService::new(store.clone()),
            territories: TerritoryService::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn synchronizer(&self) -> &RelationSynchronizer {
        &self.sync
    }

    pub fn menus(&self) -> &MenuService {
        &self.menus
    }

    pub fn roles(&self) -> &RoleService {
        &self.roles
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn territories(&self) -> &TerritoryService {
        &self.territories
    }

    /// Permission codes held by a user through any of their roles
    pub async fn effective_permissions(&self, user: UserId) -> Result<BTreeSet<String>> {
        self.resolver.effective_permissions(user).await
    }

    /// Menu forest visible to a user
    pub async fn visible_menus(&self, user: UserId) -> Result<Vec<TreeNode<Menu>>> {
        self.resolver.visible_menus(user).await
    }

    pub async fn has_any_permission(&self, user: UserId, codes: &[&str]) -> Result<bool> {
        self.resolver.has_any_permission(user, codes).await
    }

    pub async fn has_any_role(&self, user: UserId, names: &[&str]) -> Result<bool> {
        self.resolver.has_any_role(user, names).await
    }

    pub async fn authorize(&self, user: UserId, codes: &[&str]) -> Result<bool> {
        self.resolver.authorize(user, codes).await
    }

    /// Replace the whole edge set of `left` in one transaction
    pub async fn replace_edges(&self, relation: Relation, left: Id, rights: &[Id]) -> Result<SyncReport> {
        self.sync.replace_edges(relation, left, rights).await
    }
}

impl Default for AtlasEngine {
    fn default() -> Self {
        Self::new()
    }
}
