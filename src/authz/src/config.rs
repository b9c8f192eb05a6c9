//! Engine configuration

use atlas_core::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a menu with no required-permission edges means
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRequirementPolicy {
    /// Visible to every user
    #[default]
    Unrestricted,
    /// Visible only to holders of the admin role
    AdminOnly,
}

impl FromStr for EmptyRequirementPolicy {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" => Ok(Self::Unrestricted),
            "admin_only" | "admin-only" => Ok(Self::AdminOnly),
            other => Err(AtlasError::invalid(format!(
                "unknown empty requirement policy '{}'",
                other
            ))),
        }
    }
}

/// Resolution and administration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Role whose holders pass every `authorize` check
    pub admin_role: String,

    /// Visibility of menus without required permissions
    pub empty_requirement_policy: EmptyRequirementPolicy,

    /// Shortest accepted division search term
    pub search_min_chars: usize,

    /// Maximum number of division search results
    pub search_limit: usize,

    /// Level given to root menus
    pub menu_root_level: i32,

    /// Level given to root divisions
    pub division_root_level: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin_role: "ADMIN".to_string(),
            empty_requirement_policy: EmptyRequirementPolicy::Unrestricted,
            search_min_chars: 2,
            search_limit: 50,
            menu_root_level: 1,
            division_root_level: 1,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `ATLAS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `ATLAS_*` key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(role) = lookup("ATLAS_ADMIN_ROLE").filter(|r| !r.trim().is_empty()) {
            config.admin_role = role.trim().to_string();
        }
        if let Some(policy) = lookup("ATLAS_EMPTY_MENU_POLICY") {
            config.empty_requirement_policy = policy.parse()?;
        }
        if let Some(value) = lookup("ATLAS_SEARCH_MIN_CHARS") {
            config.search_min_chars = parse_number("ATLAS_SEARCH_MIN_CHARS", &value)?;
        }
        if let Some(value) = lookup("ATLAS_SEARCH_LIMIT") {
            config.search_limit = parse_number("ATLAS_SEARCH_LIMIT", &value)?;
        }

        Ok(config)
    }

    /// Level of a node whose parent sits at `parent_level`, or of a root
    pub fn child_level(root_level: i32, parent_level: Option<i32>) -> i32 {
        parent_level.map_or(root_level, |level| level + 1)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AtlasError::invalid(format!("{} must be a number, got '{}'", key, value)))
}
