//! Permission resolution against a relation store
//!
//! Every call loads what it needs from the store; nothing is cached between
//! calls, so there is nothing to invalidate after an administrative write.
//! One call reads through one transaction, which it never commits, so all of
//! its reads see the same committed state.
//!
//! Role names and permission codes match case-insensitively, the same way
//! their uniqueness is enforced.

use super::visibility::{filter_visible, AccessContext};
use crate::config::EngineConfig;
use crate::hierarchy::{build_forest, TreeNode};
use atlas_core::types::{Menu, MenuId, Permission, PermissionId, Role, User, UserId};
use atlas_core::{
    EntityKind, Filter, Relation, RelationStore, Result, Transaction, TransactionExt,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a user holds through their role edges
struct Grants {
    /// Ordered by name
    roles: Vec<Role>,
    permissions: BTreeSet<PermissionId>,
}

impl Grants {
    fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name.eq_ignore_ascii_case(name))
    }
}

/// Resolves users to roles, permissions and visible menus
pub struct PermissionResolver {
    store: Arc<dyn RelationStore>,
    config: EngineConfig,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Roles assigned to a user, ordered by name
    pub async fn user_roles(&self, user: UserId) -> Result<Vec<Role>> {
        let mut tx = self.store.begin().await?;
        let grants = self.grants(tx.as_mut(), user).await?;
        tx.rollback().await?;
        Ok(grants.roles)
    }

    /// Union of the permission ids of every role the user holds
    pub async fn effective_permission_ids(&self, user: UserId) -> Result<BTreeSet<PermissionId>> {
        let mut tx = self.store.begin().await?;
        let grants = self.grants(tx.as_mut(), user).await?;
        tx.rollback().await?;
        Ok(grants.permissions)
    }

    /// Codes of the user's effective permissions
    pub async fn effective_permissions(&self, user: UserId) -> Result<BTreeSet<String>> {
        let mut tx = self.store.begin().await?;
        let grants = self.grants(tx.as_mut(), user).await?;
        let codes = codes_of(tx.as_mut(), &grants.permissions).await?;
        tx.rollback().await?;
        Ok(codes)
    }

    /// Whether the user holds at least one of the named roles
    pub async fn has_any_role(&self, user: UserId, names: &[&str]) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        let grants = self.grants(tx.as_mut(), user).await?;
        tx.rollback().await?;
        Ok(names.iter().any(|name| grants.has_role(name)))
    }

    /// Whether the user holds at least one of the given permission codes
    pub async fn has_any_permission(&self, user: UserId, codes: &[&str]) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        let grants = self.grants(tx.as_mut(), user).await?;
        let held = codes_of(tx.as_mut(), &grants.permissions).await?;
        tx.rollback().await?;
        Ok(holds_any(&held, codes))
    }

    /// Request authorization: admin role passes, otherwise any-of `codes`
    pub async fn authorize(&self, user: UserId, codes: &[&str]) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        let grants = self.grants(tx.as_mut(), user).await?;

        if grants.has_role(&self.config.admin_role) {
            tx.rollback().await?;
            debug!(user, "Admin role bypasses permission check");
            return Ok(true);
        }

        let held = codes_of(tx.as_mut(), &grants.permissions).await?;
        tx.rollback().await?;

        let allowed = holds_any(&held, codes);
        debug!(user, ?codes, allowed, "Authorization decided");
        Ok(allowed)
    }

    /// Inputs of the visibility rule for one user
    pub async fn access_context(&self, user: UserId) -> Result<AccessContext> {
        let mut tx = self.store.begin().await?;
        let access = self.load_access(tx.as_mut(), user).await?;
        tx.rollback().await?;
        Ok(access)
    }

    /// Required permission ids of every menu that has any
    pub async fn menu_requirements(&self) -> Result<HashMap<MenuId, Vec<PermissionId>>> {
        let mut tx = self.store.begin().await?;
        let requirements = requirements_in(tx.as_mut()).await?;
        tx.rollback().await?;
        Ok(requirements)
    }

    /// Menus the user may see, flat and ordered by (level, order, name)
    pub async fn visible_menu_list(&self, user: UserId) -> Result<Vec<Menu>> {
        let mut tx = self.store.begin().await?;
        let access = self.load_access(tx.as_mut(), user).await?;
        let requirements = requirements_in(tx.as_mut()).await?;
        let mut menus = tx.list::<Menu>(&Filter::all()).await?;
        tx.rollback().await?;

        menus.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let visible = filter_visible(
            menus,
            &requirements,
            &access,
            self.config.empty_requirement_policy,
        );
        debug!(user, visible = visible.len(), "Filtered menus");
        Ok(visible)
    }

    /// Menus the user may see, as a forest
    ///
    /// A menu whose parent was filtered out becomes a root.
    pub async fn visible_menus(&self, user: UserId) -> Result<Vec<TreeNode<Menu>>> {
        let visible = self.visible_menu_list(user).await?;
        build_forest(visible).map_err(|e| {
            warn!(user, error = %e, "Corrupt menu hierarchy");
            e.into_atlas(EntityKind::Menu)
        })
    }

    async fn grants(&self, tx: &mut dyn Transaction, user: UserId) -> Result<Grants> {
        tx.require::<User>(user).await?;

        let role_ids: BTreeSet<_> = tx
            .get_edges(Relation::UserRole, user)
            .await?
            .into_iter()
            .collect();

        let mut roles = Vec::with_capacity(role_ids.len());
        let mut permissions = BTreeSet::new();
        for &id in &role_ids {
            if let Some(role) = tx.fetch::<Role>(id).await? {
                roles.push(role);
            }
            permissions.extend(tx.get_edges(Relation::RolePermission, id).await?);
        }
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(user, roles = roles.len(), permissions = permissions.len(), "Resolved grants");
        Ok(Grants { roles, permissions })
    }

    async fn load_access(&self, tx: &mut dyn Transaction, user: UserId) -> Result<AccessContext> {
        let grants = self.grants(tx, user).await?;
        let overrides = tx.overrides_for_user(user).await?;
        let is_admin = grants.has_role(&self.config.admin_role);

        Ok(AccessContext::new(grants.permissions)
            .with_overrides(overrides)
            .with_admin(is_admin))
    }
}

async fn codes_of(tx: &mut dyn Transaction, ids: &BTreeSet<PermissionId>) -> Result<BTreeSet<String>> {
    let mut codes = BTreeSet::new();
    for &id in ids {
        if let Some(permission) = tx.fetch::<Permission>(id).await? {
            codes.insert(permission.code);
        }
    }
    Ok(codes)
}

async fn requirements_in(tx: &mut dyn Transaction) -> Result<HashMap<MenuId, Vec<PermissionId>>> {
    let mut requirements: HashMap<MenuId, Vec<PermissionId>> = HashMap::new();
    for (menu, permission) in tx.all_edges(Relation::MenuPermission).await? {
        requirements.entry(menu).or_default().push(permission);
    }
    Ok(requirements)
}

fn holds_any(held: &BTreeSet<String>, codes: &[&str]) -> bool {
    codes
        .iter()
        .any(|code| held.iter().any(|h| h.eq_ignore_ascii_case(code)))
}
