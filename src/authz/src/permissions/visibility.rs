//! Menu visibility rule
//!
//! A menu is shown when its `visible` flag is set and, unless the user has a
//! deny override for it, one of the following holds:
//!
//! - the user has an allow override for it
//! - it has no required permissions (subject to [`EmptyRequirementPolicy`])
//! - the user holds at least one of its required permissions

use crate::config::EmptyRequirementPolicy;
use atlas_core::types::{Menu, MenuId, MenuOverride, PermissionId};
use std::collections::{HashMap, HashSet};

/// Everything the rule needs to know about one user
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    /// Ids of every permission granted through the user's roles
    pub held: HashSet<PermissionId>,

    /// Explicit per-menu decisions, `true` = allow
    pub overrides: HashMap<MenuId, bool>,

    /// Whether the user holds the admin role
    pub is_admin: bool,
}

impl AccessContext {
    pub fn new(held: impl IntoIterator<Item = PermissionId>) -> Self {
        Self {
            held: held.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = MenuOverride>) -> Self {
        self.overrides
            .extend(overrides.into_iter().map(|o| (o.menu_id, o.allowed)));
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

/// Decide a single menu
pub fn is_visible(
    menu: &Menu,
    required: &[PermissionId],
    access: &AccessContext,
    policy: EmptyRequirementPolicy,
) -> bool {
    if !menu.visible {
        return false;
    }

    match access.overrides.get(&menu.id) {
        Some(false) => return false,
        Some(true) => return true,
        None => {}
    }

    if required.is_empty() {
        return match policy {
            EmptyRequirementPolicy::Unrestricted => true,
            EmptyRequirementPolicy::AdminOnly => access.is_admin,
        };
    }

    required.iter().any(|p| access.held.contains(p))
}

/// Keep the menus the user may see, preserving input order
pub fn filter_visible(
    menus: Vec<Menu>,
    requirements: &HashMap<MenuId, Vec<PermissionId>>,
    access: &AccessContext,
    policy: EmptyRequirementPolicy,
) -> Vec<Menu> {
    menus
        .into_iter()
        .filter(|menu| {
            let required = requirements.get(&menu.id).map(Vec::as_slice).unwrap_or(&[]);
            is_visible(menu, required, access, policy)
        })
        .collect()
}
