//! Identifiers, entity kinds and relation names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage identifier shared by every entity kind
pub type Id = i64;

pub type UserId = Id;
pub type RoleId = Id;
pub type PermissionId = Id;
pub type MenuId = Id;
pub type ContinentId = Id;
pub type CountryId = Id;
pub type DivisionTypeId = Id;
pub type DivisionId = Id;

/// Every entity kind the relation store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Role,
    Permission,
    Menu,
    Continent,
    Country,
    DivisionType,
    Division,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::User,
        EntityKind::Role,
        EntityKind::Permission,
        EntityKind::Menu,
        EntityKind::Continent,
        EntityKind::Country,
        EntityKind::DivisionType,
        EntityKind::Division,
    ];

    /// Storage name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Role => "role",
            EntityKind::Permission => "permission",
            EntityKind::Menu => "menu",
            EntityKind::Continent => "continent",
            EntityKind::Country => "country",
            EntityKind::DivisionType => "division_type",
            EntityKind::Division => "division",
        }
    }

    /// Whether entities of this kind carry a parent pointer of the same kind
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, EntityKind::Menu | EntityKind::Division)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Many-to-many relations between entities
///
/// Edges are stored keyed by their left endpoint; the right endpoint is the
/// member. Explicit menu overrides carry a payload and are kept apart from
/// these plain edge sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// User holds role
    UserRole,
    /// Role grants permission
    RolePermission,
    /// Menu requires permission (any-of)
    MenuPermission,
}

impl Relation {
    pub const ALL: [Relation; 3] = [
        Relation::UserRole,
        Relation::RolePermission,
        Relation::MenuPermission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::UserRole => "user_role",
            Relation::RolePermission => "role_permission",
            Relation::MenuPermission => "menu_permission",
        }
    }

    /// Kind of the left endpoint
    pub fn left(&self) -> EntityKind {
        match self {
            Relation::UserRole => EntityKind::User,
            Relation::RolePermission => EntityKind::Role,
            Relation::MenuPermission => EntityKind::Menu,
        }
    }

    /// Kind of the right endpoint
    pub fn right(&self) -> EntityKind {
        match self {
            Relation::UserRole => EntityKind::Role,
            Relation::RolePermission | Relation::MenuPermission => EntityKind::Permission,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
