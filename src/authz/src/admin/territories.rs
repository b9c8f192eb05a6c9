//! Continents, countries and administrative divisions
//!
//! Division queries load the whole country's divisions once and walk the
//! snapshot in memory; the collections are small enough that this beats
//! repeated single-step lookups.

use super::{require_text, shift_subtree_levels};
use crate::config::EngineConfig;
use crate::guard::IntegrityGuard;
use crate::hierarchy::{build_forest, Hierarchy, HierarchyError, TreeNode};
use atlas_core::types::{
    Continent, ContinentId, Country, CountryId, Division, DivisionId, DivisionType,
};
use atlas_core::{
    AtlasError, EntityKind, Filter, RelationStore, Result, StoreExt, Transaction, TransactionExt,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Aggregates over the direct active children of a division
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivisionStats {
    pub subdivisions: usize,
    pub population: i64,
    pub area_km2: f64,
}

impl DivisionStats {
    fn over<'a>(children: impl IntoIterator<Item = &'a Division>) -> Self {
        children.into_iter().fold(Self::default(), |mut stats, d| {
            stats.subdivisions += 1;
            stats.population += d.population.unwrap_or(0);
            stats.area_km2 += d.area_km2.unwrap_or(0.0);
            stats
        })
    }
}

/// A division with its direct active children and their aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivisionDetail {
    pub division: Division,
    pub children: Vec<Division>,
    pub stats: DivisionStats,
}

/// A country with its division levels and its active division forest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryStructure {
    pub country: Country,
    pub division_types: Vec<DivisionType>,
    pub divisions: Vec<TreeNode<Division>>,
}

fn by_name(a: &Division, b: &Division) -> std::cmp::Ordering {
    a.name.cmp(&b.name)
}

pub struct TerritoryService {
    store: Arc<dyn RelationStore>,
    config: EngineConfig,
    guard: IntegrityGuard,
}

impl TerritoryService {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            guard: IntegrityGuard::new(),
        }
    }

    // Continents

    /// Every continent, ordered by name
    pub async fn continents(&self) -> Result<Vec<Continent>> {
        let mut continents = self.store.list::<Continent>(&Filter::all()).await?;
        continents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(continents)
    }

    pub async fn continent(&self, id: ContinentId) -> Result<Continent> {
        self.store.require::<Continent>(id).await
    }

    pub async fn continent_by_code(&self, code: &str) -> Result<Option<Continent>> {
        let continents = self.store.list::<Continent>(&Filter::all()).await?;
        Ok(continents.into_iter().find(|c| c.code.eq_ignore_ascii_case(code)))
    }

    pub async fn create_continent(&self, mut continent: Continent) -> Result<Continent> {
        require_text("continent name", &continent.name)?;
        require_text("continent code", &continent.code)?;

        let mut tx = self.store.begin().await?;
        self.guard
            .ensure_unique_code(tx.as_mut(), EntityKind::Continent, &Filter::all(), &continent.code, None)
            .await?;
        continent.id = tx.insert(continent.clone().into()).await?;
        tx.commit().await?;

        info!(continent = continent.id, code = %continent.code, "Created continent");
        Ok(continent)
    }

    /// Delete a continent that holds no country
    pub async fn delete_continent(&self, id: ContinentId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Continent, id).await?;
        self.guard
            .ensure_not_referenced(
                tx.as_mut(),
                EntityKind::Continent,
                id,
                EntityKind::Country,
                &Filter::all().with_continent(id),
            )
            .await?;
        tx.delete(EntityKind::Continent, id).await?;
        tx.commit().await?;

        info!(continent = id, "Deleted continent");
        Ok(())
    }

    // Countries

    /// Countries ordered by name, optionally filtered by activation
    pub async fn countries(&self, active: Option<bool>) -> Result<Vec<Country>> {
        let filter = match active {
            Some(active) => Filter::all().with_active(active),
            None => Filter::all(),
        };
        let mut countries = self.store.list::<Country>(&filter).await?;
        countries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(countries)
    }

    pub async fn country(&self, id: CountryId) -> Result<Country> {
        self.store.require::<Country>(id).await
    }

    /// Look a country up by its ISO alpha-2 or alpha-3 code
    pub async fn country_by_code(&self, code: &str) -> Result<Option<Country>> {
        let countries = self.store.list::<Country>(&Filter::all()).await?;
        Ok(countries.into_iter().find(|c| c.has_code(code)))
    }

    /// Active countries of a continent, ordered by name
    pub async fn countries_of_continent(&self, continent: ContinentId) -> Result<Vec<Country>> {
        self.store.require::<Continent>(continent).await?;

        let filter = Filter::all().with_continent(continent).active_only();
        let mut countries = self.store.list::<Country>(&filter).await?;
        countries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(countries)
    }

    pub async fn create_country(&self, mut country: Country) -> Result<Country> {
        require_text("country name", &country.name)?;

        let mut tx = self.store.begin().await?;
        self.check_country(tx.as_mut(), &country, None).await?;
        country.id = tx.insert(country.clone().into()).await?;
        tx.commit().await?;

        info!(country = country.id, iso = %country.iso_alpha2, "Created country");
        Ok(country)
    }

    pub async fn update_country(&self, id: CountryId, mut country: Country) -> Result<Country> {
        require_text("country name", &country.name)?;
        country.id = id;

        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Country, id).await?;
        self.check_country(tx.as_mut(), &country, Some(id)).await?;
        tx.update(country.clone().into()).await?;
        tx.commit().await?;

        info!(country = id, "Updated country");
        Ok(country)
    }

    pub async fn set_country_active(&self, id: CountryId, active: bool) -> Result<Country> {
        let mut tx = self.store.begin().await?;
        let mut country = tx.require::<Country>(id).await?;
        country.active = active;
        tx.update(country.clone().into()).await?;
        tx.commit().await?;

        info!(country = id, active, "Changed country activation");
        Ok(country)
    }

    /// Delete a country that has no division types and no divisions
    pub async fn delete_country(&self, id: CountryId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Country, id).await?;
        for child_kind in [EntityKind::Division, EntityKind::DivisionType] {
            self.guard
                .ensure_not_referenced(
                    tx.as_mut(),
                    EntityKind::Country,
                    id,
                    child_kind,
                    &Filter::all().with_country(id),
                )
                .await?;
        }
        tx.delete(EntityKind::Country, id).await?;
        tx.commit().await?;

        info!(country = id, "Deleted country");
        Ok(())
    }

    async fn check_country(
        &self,
        tx: &mut dyn Transaction,
        country: &Country,
        exclude: Option<CountryId>,
    ) -> Result<()> {
        if country.iso_alpha2.len() != 2 || country.iso_alpha3.len() != 3 {
            return Err(AtlasError::invalid(format!(
                "ISO codes must have 2 and 3 letters, got '{}' and '{}'",
                country.iso_alpha2, country.iso_alpha3
            )));
        }
        tx.ensure_exists(EntityKind::Continent, country.continent_id).await?;
        for code in [&country.iso_alpha2, &country.iso_alpha3] {
            self.guard
                .ensure_unique_code(tx, EntityKind::Country, &Filter::all(), code, exclude)
                .await?;
        }
        Ok(())
    }

    // Division types

    /// Division levels of a country, ordered by level
    pub async fn division_types(&self, country: CountryId) -> Result<Vec<DivisionType>> {
        self.store.require::<Country>(country).await?;

        let mut types = self
            .store
            .list::<DivisionType>(&Filter::all().with_country(country))
            .await?;
        types.sort_by_key(|t| t.level);
        Ok(types)
    }

    pub async fn create_division_type(&self, mut division_type: DivisionType) -> Result<DivisionType> {
        require_text("division type name", &division_type.name)?;

        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Country, division_type.country_id).await?;
        division_type.id = tx.insert(division_type.clone().into()).await?;
        tx.commit().await?;

        info!(division_type = division_type.id, country = division_type.country_id, "Created division type");
        Ok(division_type)
    }

    /// Country with its division types and its active divisions as a forest
    pub async fn country_structure(&self, id: CountryId) -> Result<CountryStructure> {
        let country = self.country(id).await?;
        let division_types = self.division_types(id).await?;

        let mut active = self
            .store
            .list::<Division>(&Filter::all().with_country(id).active_only())
            .await?;
        active.sort_by(by_name);
        let divisions = self.forest(active)?;

        Ok(CountryStructure {
            country,
            division_types,
            divisions,
        })
    }

    // Divisions

    pub async fn division(&self, id: DivisionId) -> Result<Division> {
        self.store.require::<Division>(id).await
    }

    /// Divisions matching `filter`, ordered by name
    pub async fn divisions(&self, filter: &Filter) -> Result<Vec<Division>> {
        let mut divisions = self.store.list::<Division>(filter).await?;
        divisions.sort_by(by_name);
        Ok(divisions)
    }

    pub async fn division_by_code(&self, country: CountryId, code: &str) -> Result<Option<Division>> {
        let divisions = self.store.list::<Division>(&Filter::all().with_country(country)).await?;
        Ok(divisions.into_iter().find(|d| d.code.eq_ignore_ascii_case(code)))
    }

    /// Forest of every division of a country, siblings ordered by name
    pub async fn division_tree(&self, country: CountryId) -> Result<Vec<TreeNode<Division>>> {
        self.store.require::<Country>(country).await?;
        let divisions = self.divisions(&Filter::all().with_country(country)).await?;
        self.forest(divisions)
    }

    /// Direct active children, ordered by name
    pub async fn children(&self, id: DivisionId) -> Result<Vec<Division>> {
        self.store.require::<Division>(id).await?;
        self.divisions(&Filter::children_of(id).active_only()).await
    }

    /// Count, population and area over the direct active children
    pub async fn stats(&self, id: DivisionId) -> Result<DivisionStats> {
        let children = self.children(id).await?;
        Ok(DivisionStats::over(&children))
    }

    pub async fn detail(&self, id: DivisionId) -> Result<DivisionDetail> {
        let division = self.division(id).await?;
        let children = self.children(id).await?;
        let stats = DivisionStats::over(&children);
        Ok(DivisionDetail {
            division,
            children,
            stats,
        })
    }

    /// Path from the country-level root down to the division, root first
    pub async fn ancestry(&self, id: DivisionId) -> Result<Vec<Division>> {
        let hierarchy = self.country_snapshot(id).await?;
        let path = hierarchy
            .ancestry_path(id)
            .map_err(|e| self.corrupt(e))?;
        Ok(path.into_iter().cloned().collect())
    }

    /// The division and everything below it, siblings ordered by name
    pub async fn subtree(&self, id: DivisionId) -> Result<TreeNode<Division>> {
        let hierarchy = self.country_snapshot(id).await?;

        let mut members: Vec<Division> = hierarchy
            .descendants(id)
            .map_err(|e| self.corrupt(e))?
            .into_iter()
            .cloned()
            .collect();
        members.sort_by(by_name);

        let mut root = hierarchy
            .get(id)
            .cloned()
            .ok_or_else(|| AtlasError::not_found(EntityKind::Division, id))?;
        // Detach so the subtree root becomes the single forest root
        root.parent_id = None;
        members.insert(0, root);

        self.forest(members)?
            .into_iter()
            .next()
            .ok_or_else(|| AtlasError::not_found(EntityKind::Division, id))
    }

    /// Active divisions whose name contains `term`, ordered by name
    pub async fn search(&self, term: &str, country: Option<CountryId>) -> Result<Vec<Division>> {
        let term = term.trim();
        if term.chars().count() < self.config.search_min_chars {
            return Err(AtlasError::invalid(format!(
                "search term must have at least {} characters",
                self.config.search_min_chars
            )));
        }

        let mut filter = Filter::all().active_only().with_name_containing(term);
        if let Some(country) = country {
            filter = filter.with_country(country);
        }

        let mut found = self.divisions(&filter).await?;
        found.truncate(self.config.search_limit);
        Ok(found)
    }

    /// Create a division; its level is derived from the parent
    pub async fn create_division(&self, mut division: Division) -> Result<Division> {
        require_text("division name", &division.name)?;
        require_text("division code", &division.code)?;

        let mut tx = self.store.begin().await?;
        self.check_division(tx.as_mut(), &mut division, None).await?;
        division.id = tx.insert(division.clone().into()).await?;
        tx.commit().await?;

        info!(
            division = division.id,
            country = division.country_id,
            level = division.level,
            "Created division"
        );
        Ok(division)
    }

    /// Replace a division's fields; the country never changes
    ///
    /// Moving a division rewrites the levels of its whole subtree.
    pub async fn update_division(&self, id: DivisionId, mut division: Division) -> Result<Division> {
        require_text("division name", &division.name)?;
        require_text("division code", &division.code)?;
        division.id = id;

        let mut tx = self.store.begin().await?;
        let current = tx.require::<Division>(id).await?;
        division.country_id = current.country_id;
        self.check_division(tx.as_mut(), &mut division, Some(id)).await?;

        tx.update(division.clone().into()).await?;
        let moved = shift_subtree_levels(
            tx.as_mut(),
            EntityKind::Division,
            id,
            division.level - current.level,
        )
        .await?;
        tx.commit().await?;

        info!(division = id, level = division.level, moved, "Updated division");
        Ok(division)
    }

    pub async fn set_division_active(&self, id: DivisionId, active: bool) -> Result<Division> {
        let mut tx = self.store.begin().await?;
        let mut division = tx.require::<Division>(id).await?;
        division.active = active;
        tx.update(division.clone().into()).await?;
        tx.commit().await?;

        info!(division = id, active, "Changed division activation");
        Ok(division)
    }

    /// Delete a division without subdivisions
    pub async fn delete_division(&self, id: DivisionId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.ensure_exists(EntityKind::Division, id).await?;
        self.guard
            .ensure_no_children(tx.as_mut(), EntityKind::Division, id)
            .await?;
        tx.delete(EntityKind::Division, id).await?;
        tx.commit().await?;

        info!(division = id, "Deleted division");
        Ok(())
    }

    /// Validate references and uniqueness, then derive the level
    async fn check_division(
        &self,
        tx: &mut dyn Transaction,
        division: &mut Division,
        node: Option<DivisionId>,
    ) -> Result<()> {
        tx.ensure_exists(EntityKind::Country, division.country_id).await?;
        self.guard
            .check_division_type(tx, division.division_type_id, division.country_id)
            .await?;

        let parent = self.guard.check_division_parent(tx, division, node).await?;
        division.level = EngineConfig::child_level(
            self.config.division_root_level,
            parent.map(|p| p.level),
        );

        self.guard
            .ensure_unique_code(
                tx,
                EntityKind::Division,
                &Filter::all().with_country(division.country_id),
                &division.code,
                node,
            )
            .await
    }

    /// Snapshot of the divisions sharing a country with `id`
    async fn country_snapshot(&self, id: DivisionId) -> Result<Hierarchy<Division>> {
        let division = self.division(id).await?;
        let divisions = self
            .store
            .list::<Division>(&Filter::all().with_country(division.country_id))
            .await?;
        Hierarchy::new(divisions).map_err(|e| self.corrupt(e))
    }

    fn forest(&self, divisions: Vec<Division>) -> Result<Vec<TreeNode<Division>>> {
        build_forest(divisions).map_err(|e| self.corrupt(e))
    }

    fn corrupt(&self, e: HierarchyError) -> AtlasError {
        warn!(error = %e, "Corrupt division hierarchy");
        e.into_atlas(EntityKind::Division)
    }
}
