//! Parent-pointer hierarchies
//!
//! Shared by the menu tree and the administrative-division tree.
//!
//! # Features
//!
//! - **Forest building**: one linear pass, input order preserved, orphans
//!   promoted to roots
//! - **Ancestry / descendants**: over an in-memory snapshot or by stepping
//!   through a store or open transaction
//! - **Corruption detection**: parent chains that never reach a root are
//!   reported as cycles instead of looping
//!
//! # Example
//!
//! ```rust
//! use atlas_authz::hierarchy::{build_forest, Hierarchy};
//! use atlas_core::types::Menu;
//!
//! let menus = vec![
//!     Menu { id: 1, ..Menu::new("Admin") },
//!     Menu { id: 2, ..Menu::new("Users").with_parent(1) },
//! ];
//!
//! let hierarchy = Hierarchy::new(menus.clone()).unwrap();
//! assert_eq!(hierarchy.ancestry_path(2).unwrap().len(), 2);
//!
//! let forest = build_forest(menus).unwrap();
//! assert_eq!(forest[0].children[0].node.name, "Users");
//! ```

pub mod forest;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use forest::{build_forest, HierarchyError, HierarchyNode, Preorder, TreeNode};
pub use resolver::{
    ancestry_ids, descendant_ids, Hierarchy, HierarchySource, StoreHierarchy, TxHierarchy,
};
