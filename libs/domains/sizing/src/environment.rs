//! Environments, node roles and per-environment application counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Deployment environment
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnvironmentKind {
    Dev,
    Test,
    Stage,
    Prod,
    #[serde(rename = "dr")]
    #[strum(serialize = "dr")]
    DR,
}

impl EnvironmentKind {
    /// Prod and DR share production defaults
    pub fn is_production_like(&self) -> bool {
        matches!(self, EnvironmentKind::Prod | EnvironmentKind::DR)
    }
}

/// Node class a spec applies to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeRole {
    ControlPlane,
    Infra,
    Worker,
}

/// Workload size tier
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SizeTier {
    Small,
    Medium,
    Large,
    #[serde(rename = "xlarge")]
    #[strum(serialize = "xlarge")]
    XLarge,
}

/// Application counts per size tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppTierCounts {
    pub small: u32,
    pub medium: u32,
    pub large: u32,
    pub xlarge: u32,
}

impl AppTierCounts {
    pub fn new(small: u32, medium: u32, large: u32, xlarge: u32) -> Self {
        Self {
            small,
            medium,
            large,
            xlarge,
        }
    }

    pub fn get(&self, tier: SizeTier) -> u32 {
        match tier {
            SizeTier::Small => self.small,
            SizeTier::Medium => self.medium,
            SizeTier::Large => self.large,
            SizeTier::XLarge => self.xlarge,
        }
    }

    pub fn total(&self) -> u32 {
        self.small
            .saturating_add(self.medium)
            .saturating_add(self.large)
            .saturating_add(self.xlarge)
    }

    /// Non-empty tiers with their counts
    pub fn tiers(&self) -> impl Iterator<Item = (SizeTier, u32)> + '_ {
        [
            SizeTier::Small,
            SizeTier::Medium,
            SizeTier::Large,
            SizeTier::XLarge,
        ]
        .into_iter()
        .map(|tier| (tier, self.get(tier)))
        .filter(|(_, count)| *count > 0)
    }
}

/// Application counts with per-environment overrides and Prod/NonProd fallbacks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppCounts {
    pub per_environment: BTreeMap<EnvironmentKind, AppTierCounts>,
    pub production: Option<AppTierCounts>,
    pub non_production: Option<AppTierCounts>,
}

impl AppCounts {
    /// Same counts in every environment
    pub fn uniform(counts: AppTierCounts) -> Self {
        Self {
            per_environment: BTreeMap::new(),
            production: Some(counts),
            non_production: Some(counts),
        }
    }

    /// Counts for one environment; missing sources resolve to zero apps
    pub fn resolve(&self, environment: EnvironmentKind) -> AppTierCounts {
        with_fallback(
            environment,
            self.per_environment.get(&environment).copied(),
            self.production,
            self.non_production,
        )
        .unwrap_or_default()
    }
}

/// Per-environment value first, then the production-like or
/// non-production fallback.
pub fn with_fallback<T>(
    environment: EnvironmentKind,
    exact: Option<T>,
    production: Option<T>,
    non_production: Option<T>,
) -> Option<T> {
    match exact {
        Some(value) => Some(value),
        None if environment.is_production_like() => production,
        None => non_production,
    }
}
