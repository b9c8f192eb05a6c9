//! # Atlas Authorization Engine
//!
//! Access-control and taxonomy resolution for an administrative backend.
//!
//! ## Features
//!
//! - **Permission resolution**: users → roles → permissions, any-of gating
//! - **Menu visibility** with per-user allow/deny overrides, as an ordered forest
//! - **Parent-pointer hierarchies** shared by menus and administrative divisions
//! - **Integrity guard**: self-parent, cycle, children, member and uniqueness checks
//! - **Replace-all synchronization** of many-to-many edge sets in one transaction
//! - **Pluggable storage**: in-memory store, PostgreSQL behind the `postgres` feature
//!
//! ## Example
//!
//! ```rust
//! use atlas_authz::AtlasEngine;
//! use atlas_core::types::{Menu, Permission, Role, User};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AtlasEngine::new();
//!
//!     let ver = engine.permissions().create(Permission::new("MENUS_VER")).await?;
//!     let viewer = engine.roles().create(Role::new("VIEWER")).await?;
//!     engine.roles().sync_permissions(viewer.id, &[ver.id]).await?;
//!
//!     let user = engine.users().create(User::new("ana")).await?;
//!     engine.users().assign_role(user.id, viewer.id).await?;
//!
//!     let menu = engine.menus().create(Menu::new("Menus")).await?;
//!     engine.menus().add_permission(menu.id, ver.id).await?;
//!
//!     let tree = engine.visible_menus(user.id).await?;
//!     assert_eq!(tree.len(), 1);
//!     assert!(engine.authorize(user.id, &["MENUS_VER"]).await?);
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod config;
pub mod engine;
pub mod guard;
pub mod hierarchy;
pub mod permissions;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use admin::{MenuService, Page, PermissionService, RoleService, TerritoryService, UserService};
pub use config::{EmptyRequirementPolicy, EngineConfig};
pub use engine::AtlasEngine;
pub use guard::IntegrityGuard;
pub use hierarchy::{build_forest, Hierarchy, HierarchyError, HierarchyNode, TreeNode};
pub use permissions::{AccessContext, PermissionResolver};
pub use store::InMemoryRelationStore;
#[cfg(feature = "postgres")]
pub use store::PostgresRelationStore;
pub use sync::{RelationSynchronizer, SyncReport};

pub use atlas_core::{AtlasError, ErrorKind, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
