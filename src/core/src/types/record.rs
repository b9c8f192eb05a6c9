//! Kind-tagged entity records and query filters
//!
//! The relation store is addressed by `(EntityKind, Id)`; [`Record`] is the
//! value it hands back. Typed code converts through the [`Entity`] trait.

use super::access::{Menu, Permission, Role, User};
use super::ids::{ContinentId, CountryId, EntityKind, Id};
use super::territory::{Continent, Country, Division, DivisionType};
use serde::{Deserialize, Deserializer, Serialize};

/// Any stored entity, tagged with its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    User(User),
    Role(Role),
    Permission(Permission),
    Menu(Menu),
    Continent(Continent),
    Country(Country),
    DivisionType(DivisionType),
    Division(Division),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Role(_) => EntityKind::Role,
            Record::Permission(_) => EntityKind::Permission,
            Record::Menu(_) => EntityKind::Menu,
            Record::Continent(_) => EntityKind::Continent,
            Record::Country(_) => EntityKind::Country,
            Record::DivisionType(_) => EntityKind::DivisionType,
            Record::Division(_) => EntityKind::Division,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Record::User(e) => e.id,
            Record::Role(e) => e.id,
            Record::Permission(e) => e.id,
            Record::Menu(e) => e.id,
            Record::Continent(e) => e.id,
            Record::Country(e) => e.id,
            Record::DivisionType(e) => e.id,
            Record::Division(e) => e.id,
        }
    }

    pub fn set_id(&mut self, id: Id) {
        match self {
            Record::User(e) => e.id = id,
            Record::Role(e) => e.id = id,
            Record::Permission(e) => e.id = id,
            Record::Menu(e) => e.id = id,
            Record::Continent(e) => e.id = id,
            Record::Country(e) => e.id = id,
            Record::DivisionType(e) => e.id = id,
            Record::Division(e) => e.id = id,
        }
    }

    /// Human-facing label: username, role name, permission code or entity name
    pub fn label(&self) -> &str {
        match self {
            Record::User(e) => &e.username,
            Record::Role(e) => &e.name,
            Record::Permission(e) => &e.code,
            Record::Menu(e) => &e.name,
            Record::Continent(e) => &e.name,
            Record::Country(e) => &e.name,
            Record::DivisionType(e) => &e.name,
            Record::Division(e) => &e.name,
        }
    }

    /// Parent pointer of hierarchical kinds
    pub fn parent_id(&self) -> Option<Id> {
        match self {
            Record::Menu(e) => e.parent_id,
            Record::Division(e) => e.parent_id,
            _ => None,
        }
    }

    pub fn country_id(&self) -> Option<CountryId> {
        match self {
            Record::DivisionType(e) => Some(e.country_id),
            Record::Division(e) => Some(e.country_id),
            _ => None,
        }
    }

    pub fn continent_id(&self) -> Option<ContinentId> {
        match self {
            Record::Country(e) => Some(e.continent_id),
            _ => None,
        }
    }

    pub fn level(&self) -> Option<i32> {
        match self {
            Record::Menu(e) => Some(e.level),
            Record::DivisionType(e) => Some(e.level),
            Record::Division(e) => Some(e.level),
            _ => None,
        }
    }

    pub fn active(&self) -> Option<bool> {
        match self {
            Record::User(e) => Some(e.active),
            Record::Country(e) => Some(e.active),
            Record::Division(e) => Some(e.active),
            _ => None,
        }
    }
}

/// Typed view over a [`Record`] variant
pub trait Entity: Clone + Send + Sync + Sized + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Id;

    fn set_id(&mut self, id: Id);

    fn into_record(self) -> Record;

    /// `None` when the record holds another kind
    fn from_record(record: Record) -> Option<Self>;
}

macro_rules! impl_entity {
    ($ty:ident, $kind:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn id(&self) -> Id {
                self.id
            }

            fn set_id(&mut self, id: Id) {
                self.id = id;
            }

            fn into_record(self) -> Record {
                Record::$kind(self)
            }

            fn from_record(record: Record) -> Option<Self> {
                match record {
                    Record::$kind(e) => Some(e),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Record {
            fn from(e: $ty) -> Self {
                Record::$kind(e)
            }
        }
    };
}

impl_entity!(User, User);
impl_entity!(Role, Role);
impl_entity!(Permission, Permission);
impl_entity!(Menu, Menu);
impl_entity!(Continent, Continent);
impl_entity!(Country, Country);
impl_entity!(DivisionType, DivisionType);
impl_entity!(Division, Division);

/// Conjunctive filter for `get_all`
///
/// Every criterion that is set must hold; a criterion naming an attribute the
/// record's kind does not have never matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// `Some(None)` selects roots, `Some(Some(id))` the children of `id`
    ///
    /// Serialized as `null` for roots and omitted when unset.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_field"
    )]
    pub parent: Option<Option<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<CountryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<ContinentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Case-insensitive substring of the record label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
}

/// A field that is present deserializes to `Some`, even when it is `null`
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn roots() -> Self {
        Self {
            parent: Some(None),
            ..Self::default()
        }
    }

    pub fn children_of(parent: Id) -> Self {
        Self {
            parent: Some(Some(parent)),
            ..Self::default()
        }
    }

    pub fn with_country(mut self, country: CountryId) -> Self {
        self.country = Some(country);
        self
    }

    pub fn with_continent(mut self, continent: ContinentId) -> Self {
        self.continent = Some(continent);
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn active_only(self) -> Self {
        self.with_active(true)
    }

    pub fn with_name_containing(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(parent) = self.parent {
            if !record.kind().is_hierarchical() || record.parent_id() != parent {
                return false;
            }
        }
        if let Some(country) = self.country {
            if record.country_id() != Some(country) {
                return false;
            }
        }
        if let Some(continent) = self.continent {
            if record.continent_id() != Some(continent) {
                return false;
            }
        }
        if let Some(level) = self.level {
            if record.level() != Some(level) {
                return false;
            }
        }
        if let Some(active) = self.active {
            if record.active() != Some(active) {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            let needle = fragment.to_lowercase();
            if !record.label().to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}
