//! Access-control entities: users, roles, permissions and menus

use super::ids::{Id, MenuId, PermissionId, RoleId, UserId};
use serde::{Deserialize, Serialize};

/// An administrative user
///
/// Credentials live in the external credential layer; the core only needs
/// the identity and its role edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier (0 until inserted)
    #[serde(default)]
    pub id: UserId,

    /// Login name
    pub username: String,

    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the account may sign in
    #[serde(default = "default_true")]
    pub active: bool,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: None,
            active: true,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A named bundle of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: RoleId,

    /// Unique role name (e.g. "ADMIN")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A single grantable capability, identified by its unique code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: PermissionId,

    /// Unique permission token (e.g. "MENUS_VER")
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Permission {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            id: 0,
            code: code.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A navigation entry of the administrative UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default)]
    pub id: MenuId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Client-side route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Depth in the menu forest; derived from the parent on write
    #[serde(default)]
    pub level: i32,

    /// Position among siblings
    #[serde(default)]
    pub order: i32,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MenuId>,
}

impl Menu {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            route: None,
            icon: None,
            level: 0,
            order: 0,
            visible: true,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: MenuId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Display ordering: level, then order, then name
    pub fn sort_key(&self) -> (i32, i32, &str) {
        (self.level, self.order, self.name.as_str())
    }
}

/// Explicit per-user visibility decision for one menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuOverride {
    pub menu_id: MenuId,
    pub user_id: UserId,
    /// `true` grants the menu regardless of permissions, `false` denies it
    pub allowed: bool,
}

impl MenuOverride {
    pub fn allow(menu_id: Id, user_id: Id) -> Self {
        Self {
            menu_id,
            user_id,
            allowed: true,
        }
    }

    pub fn deny(menu_id: Id, user_id: Id) -> Self {
        Self {
            menu_id,
            user_id,
            allowed: false,
        }
    }
}

fn default_true() -> bool {
    true
}
