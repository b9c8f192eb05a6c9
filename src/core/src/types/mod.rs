//! Shared entity and identifier types

pub mod ids;
pub mod access;
pub mod territory;
pub mod record;

// Re-export commonly used types
pub use ids::{
    ContinentId, CountryId, DivisionId, DivisionTypeId, EntityKind, Id, MenuId, PermissionId,
    Relation, RoleId, UserId,
};
pub use access::{Menu, MenuOverride, Permission, Role, User};
pub use territory::{Continent, Country, Division, DivisionType};
pub use record::{Entity, Filter, Record};
