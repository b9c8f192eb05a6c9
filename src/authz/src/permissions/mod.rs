//! Permission resolution engine
//!
//! Effective permissions are the union over a user's roles. Menu visibility
//! combines the `visible` flag, per-user overrides and any-of permission
//! gating; see [`visibility`] for the exact rule.

pub mod resolver;
pub mod visibility;

pub use resolver::PermissionResolver;
pub use visibility::{filter_visible, is_visible, AccessContext};
