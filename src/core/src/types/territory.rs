//! Territorial taxonomy: continents, countries and administrative divisions

use super::ids::{ContinentId, CountryId, DivisionId, DivisionTypeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continent {
    #[serde(default)]
    pub id: ContinentId,
    pub name: String,
    /// Unique short code (e.g. "SA")
    pub code: String,
}

impl Continent {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub id: CountryId,
    pub continent_id: ContinentId,
    pub name: String,
    /// ISO 3166-1 alpha-2, unique
    pub iso_alpha2: String,
    /// ISO 3166-1 alpha-3, unique
    pub iso_alpha3: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Country {
    pub fn new(
        continent_id: ContinentId,
        name: impl Into<String>,
        iso_alpha2: impl Into<String>,
        iso_alpha3: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            continent_id,
            name: name.into(),
            iso_alpha2: iso_alpha2.into(),
            iso_alpha3: iso_alpha3.into(),
            capital: None,
            active: true,
        }
    }

    /// Whether `code` is this country's alpha-2 or alpha-3 code
    pub fn has_code(&self, code: &str) -> bool {
        self.iso_alpha2.eq_ignore_ascii_case(code) || self.iso_alpha3.eq_ignore_ascii_case(code)
    }
}

/// Named division level of a country (e.g. "Province" at level 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionType {
    #[serde(default)]
    pub id: DivisionTypeId,
    pub country_id: CountryId,
    pub name: String,
    pub level: i32,
}

impl DivisionType {
    pub fn new(country_id: CountryId, name: impl Into<String>, level: i32) -> Self {
        Self {
            id: 0,
            country_id,
            name: name.into(),
            level,
        }
    }
}

/// An administrative subdivision of a country, nested under its parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
    #[serde(default)]
    pub id: DivisionId,
    pub country_id: CountryId,
    pub division_type_id: DivisionTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DivisionId>,
    pub name: String,
    /// Unique within the country
    pub code: String,
    /// Depth in the country's forest; derived from the parent on write
    #[serde(default)]
    pub level: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_km2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Division {
    pub fn new(
        country_id: CountryId,
        division_type_id: DivisionTypeId,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            country_id,
            division_type_id,
            parent_id: None,
            name: name.into(),
            code: code.into(),
            level: 0,
            population: None,
            area_km2: None,
            latitude: None,
            longitude: None,
            active: true,
        }
    }

    pub fn with_parent(mut self, parent_id: DivisionId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_population(mut self, population: i64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_area(mut self, area_km2: f64) -> Self {
        self.area_km2 = Some(area_km2);
        self
    }
}

fn default_true() -> bool {
    true
}
