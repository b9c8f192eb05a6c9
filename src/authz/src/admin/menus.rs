//! Menu administration

use super::{delete_with_edges, require_text, shift_subtree_levels};
use crate::config::EngineConfig;
use crate::guard::IntegrityGuard;
use crate::hierarchy::{build_forest, TreeNode};
use crate::sync::{RelationSynchronizer, SyncReport};
use atlas_core::types::{Menu, MenuId, MenuOverride, Permission, PermissionId, UserId};
use atlas_core::{
    EntityKind, Filter, Record, Relation, RelationStore, Result, StoreExt, Transaction,
    TransactionExt,
};
use std::sync::Arc;
use tracing::info;

pub struct MenuService {
    store: Arc<dyn RelationStore>,
    config: EngineConfig,
    guard: IntegrityGuard,
    sync: RelationSynchronizer,
}

impl MenuService {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self {
            sync: RelationSynchronizer::new(store.clone()),
            store,
            config,
            guard: IntegrityGuard::new(),
        }
    }

    pub async fn get(&self, id: MenuId) -> Result<Menu> {
        self.store.require::<Menu>(id).await
    }

    /// Every menu, ordered by (level, order, name)
    pub async fn list(&self) -> Result<Vec<Menu>> {
        let mut menus = self.store.list::<Menu>(&Filter::all()).await?;
        menus.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(menus)
    }

    /// Direct children of `parent`, or the roots when `None`, in display order
    pub async fn children(&self, parent: Option<MenuId>) -> Result<Vec<Menu>> {
        let filter = match parent {
            Some(id) => Filter::children_of(id),
            None => Filter::roots(),
        };
        let mut menus = self.store.list::<Menu>(&filter).await?;
        menus.sort_by(|a, b| (a.order, &a.name).cmp(&(b.order, &b.name)));
        Ok(menus)
    }

    /// The full, unfiltered menu forest
    pub async fn tree(&self) -> Result<Vec<TreeNode<Menu>>> {
        let menus = self.list().await?;
        build_forest(menus).map_err(|e| e.into_atlas(EntityKind::Menu))
    }

    /// Create a menu; its level is derived from the parent
    pub async fn create(&self, mut menu: Menu) -> Result<Menu> {
        require_text("menu name", &menu.name)?;

        let mut tx = self.store.begin().await?;
        let parent = self
            .guard
            .check_parent(tx.as_mut(), EntityKind::Menu, None, menu.parent_id)
            .await?;
        menu.level = EngineConfig::child_level(
            self.config.menu_root_level,
            parent.as_ref().and_then(Record::level),
        );

        menu.id = tx.insert(menu.clone().into()).await?;
        tx.commit().await?;

        info!(menu = menu.id, parent = ?menu.parent_id, level = menu.level, "Created menu");
        Ok(menu)
    }

    /// Replace a menu's fields
    ///
    /// Moving a menu rewrites the levels of its whole subtree.
    pub async fn update(&self, id: MenuId, mut menu: Menu) -> Result<Menu> {
        require_text("menu name", &menu.name)?;
        menu.id = id;

        let mut tx = self.store.begin().await?;
        let current = tx.require::<Menu>(id).await?;
        let parent = self
            .guard
            .check_parent(tx.as_mut(), EntityKind::Menu, Some(id), menu.parent_id)
            .await?;
        menu.level = EngineConfig::child_level(
            self.config.menu_root_level,
            parent.as_ref().and_then(Record::level),
        );

        tx.update(menu.clone().into()).await?;
        let moved = shift_subtree_levels(tx.as_mut(), EntityKind::Menu, id, menu.level - current.level).await?;
        tx.commit().await?;

        info!(menu = id, parent = ?menu.parent_id, level = menu.level, moved, "Updated menu");
        Ok(menu)
    }

    /// Delete a leaf menu along with its permission edges and overrides
    pub async fn delete(&self, id: MenuId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Menu, id).await?;
        self.guard.ensure_no_children(tx.as_mut(), EntityKind::Menu, id).await?;
        let edges = delete_with_edges(tx.as_mut(), EntityKind::Menu, id).await?;
        tx.commit().await?;

        info!(menu = id, edges, "Deleted menu");
        Ok(())
    }

    /// Required permissions of a menu, ordered by code
    pub async fn permissions(&self, id: MenuId) -> Result<Vec<Permission>> {
        self.store.require::<Menu>(id).await?;

        let mut permissions = Vec::new();
        for pid in self.store.get_edges(Relation::MenuPermission, id).await? {
            if let Some(permission) = self.store.fetch::<Permission>(pid).await? {
                permissions.push(permission);
            }
        }
        permissions.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(permissions)
    }

    /// Replace the required-permission set of a menu
    pub async fn sync_permissions(&self, id: MenuId, permissions: &[PermissionId]) -> Result<SyncReport> {
        self.sync
            .replace_edges(Relation::MenuPermission, id, permissions)
            .await
    }

    pub async fn add_permission(&self, id: MenuId, permission: PermissionId) -> Result<bool> {
        self.sync.add_edge(Relation::MenuPermission, id, permission).await
    }

    pub async fn remove_permission(&self, id: MenuId, permission: PermissionId) -> Result<bool> {
        self.sync.remove_edge(Relation::MenuPermission, id, permission).await
    }

    /// Record an explicit allow or deny of a menu for one user
    pub async fn set_override(&self, id: MenuId, user: UserId, allowed: bool) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.put_override(MenuOverride {
            menu_id: id,
            user_id: user,
            allowed,
        })
        .await?;
        tx.commit().await?;

        info!(menu = id, user, allowed, "Set menu override");
        Ok(())
    }

    /// Drop an explicit override; `false` if none was recorded
    pub async fn remove_override(&self, id: MenuId, user: UserId) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        let removed = tx.remove_override(id, user).await?;
        tx.commit().await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRelationStore;
    use atlas_core::AtlasError;

    fn service() -> MenuService {
        MenuService::new(Arc::new(InMemoryRelationStore::new()), EngineConfig::default())
    }

    #[tokio::test]
    async fn test_levels_follow_parent() {
        let menus = service();
        let root = menus.create(Menu::new("Admin")).await.unwrap();
        let child = menus.create(Menu::new("Users").with_parent(root.id)).await.unwrap();
        let leaf = menus.create(Menu::new("Roles").with_parent(child.id)).await.unwrap();

        assert_eq!((root.level, child.level, leaf.level), (1, 2, 3));
    }

    #[tokio::test]
    async fn test_reparent_rewrites_subtree_levels() {
        let menus = service();
        let a = menus.create(Menu::new("A")).await.unwrap();
        let b = menus.create(Menu::new("B").with_parent(a.id)).await.unwrap();
        let c = menus.create(Menu::new("C").with_parent(b.id)).await.unwrap();
        let other = menus.create(Menu::new("Other")).await.unwrap();

        // Same depth: nothing below B changes
        menus
            .update(b.id, Menu::new("B").with_parent(other.id))
            .await
            .unwrap();
        // A -> Other -> B -> C
        menus
            .update(other.id, Menu::new("Other").with_parent(a.id))
            .await
            .unwrap();

        assert_eq!(menus.get(other.id).await.unwrap().level, 2);
        assert_eq!(menus.get(b.id).await.unwrap().level, 3);
        assert_eq!(menus.get(c.id).await.unwrap().level, 4);
    }

    #[tokio::test]
    async fn test_update_rejects_self_parent_and_cycles() {
        let menus = service();
        let a = menus.create(Menu::new("A")).await.unwrap();
        let b = menus.create(Menu::new("B").with_parent(a.id)).await.unwrap();

        let err = menus
            .update(a.id, Menu::new("A").with_parent(a.id))
            .await
            .unwrap_err();
        assert_eq!(err, AtlasError::SelfParent { kind: EntityKind::Menu, id: a.id });

        let err = menus
            .update(a.id, Menu::new("A").with_parent(b.id))
            .await
            .unwrap_err();
        assert_eq!(err, AtlasError::CycleDetected { kind: EntityKind::Menu, id: a.id });

        // Hierarchy unchanged
        assert_eq!(menus.get(a.id).await.unwrap().parent_id, None);
        assert_eq!(menus.get(b.id).await.unwrap().parent_id, Some(a.id));
    }

    #[tokio::test]
    async fn test_delete_guard_and_cascade() {
        let store = Arc::new(InMemoryRelationStore::new());
        let menus = MenuService::new(store.clone(), EngineConfig::default());

        let a = menus.create(Menu::new("A")).await.unwrap();
        let b = menus.create(Menu::new("B").with_parent(a.id)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let p = tx.insert(Permission::new("MENUS_VER").into()).await.unwrap();
        tx.commit().await.unwrap();
        menus.add_permission(b.id, p).await.unwrap();

        assert!(matches!(
            menus.delete(a.id).await,
            Err(AtlasError::HasChildren { children: 1, .. })
        ));

        menus.delete(b.id).await.unwrap();
        assert!(store.get_inverse_edges(Relation::MenuPermission, p).await.unwrap().is_empty());
        menus.delete(a.id).await.unwrap();
        assert!(menus.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_ordering() {
        let menus = service();
        let root = menus.create(Menu::new("Zeta")).await.unwrap();
        menus.create(Menu::new("Alpha").with_order(2)).await.unwrap();
        menus.create(Menu::new("Beta").with_order(1)).await.unwrap();
        menus.create(Menu::new("Child").with_parent(root.id)).await.unwrap();

        let names: Vec<String> = menus.list().await.unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Zeta", "Beta", "Alpha", "Child"]);

        let roots: Vec<String> = menus.children(None).await.unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(roots, vec!["Zeta", "Beta", "Alpha"]);
    }
}
