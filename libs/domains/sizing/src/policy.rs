//! Sizing policy and calculator settings.
//!
//! Both are immutable snapshots handed to the calculator by the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};
use validator::Validate;

use crate::environment::EnvironmentKind;

/// Workload redundancy strategy
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HaPattern {
    #[default]
    None,
    ActiveActive,
    ActivePassive,
    NPlusOne,
    NPlusTwo,
}

impl HaPattern {
    /// Replicas actually scheduled for a configured replica count
    pub fn effective_replicas(&self, replicas: u32) -> u32 {
        match self {
            HaPattern::ActiveActive => replicas.max(2),
            HaPattern::ActivePassive => replicas.saturating_mul(2),
            HaPattern::None | HaPattern::NPlusOne | HaPattern::NPlusTwo => replicas,
        }
    }

    /// Spare worker nodes held back for failover
    pub fn spare_workers(&self) -> u32 {
        match self {
            HaPattern::NPlusOne => 1,
            HaPattern::NPlusTwo => 2,
            _ => 0,
        }
    }
}

/// CPU and RAM overcommit ratios
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Overcommit {
    #[validate(range(min = 1.0, max = 10.0))]
    pub cpu: f64,
    #[validate(range(min = 1.0, max = 4.0))]
    pub ram: f64,
}

impl Default for Overcommit {
    fn default() -> Self {
        Self { cpu: 1.0, ram: 1.0 }
    }
}

/// Replica, headroom and overcommit policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PolicySettings {
    pub replicas: BTreeMap<EnvironmentKind, u32>,
    /// Headroom percentage (0–100) per environment
    pub headroom_percent: BTreeMap<EnvironmentKind, f64>,
    /// When false every environment is sized without headroom
    pub headroom_enabled: bool,
    #[validate(nested)]
    pub prod_overcommit: Overcommit,
    #[validate(nested)]
    pub nonprod_overcommit: Overcommit,
    /// Node capacity withheld for OS and platform daemons
    #[validate(range(min = 0.0, max = 90.0))]
    pub system_reserve_percent: f64,
    pub ha_pattern: HaPattern,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            replicas: BTreeMap::from([
                (EnvironmentKind::Dev, 1),
                (EnvironmentKind::Test, 1),
                (EnvironmentKind::Stage, 2),
                (EnvironmentKind::Prod, 3),
                (EnvironmentKind::DR, 3),
            ]),
            headroom_percent: BTreeMap::from([
                (EnvironmentKind::Dev, 10.0),
                (EnvironmentKind::Test, 10.0),
                (EnvironmentKind::Stage, 20.0),
                (EnvironmentKind::Prod, 30.0),
                (EnvironmentKind::DR, 30.0),
            ]),
            headroom_enabled: true,
            prod_overcommit: Overcommit::default(),
            nonprod_overcommit: Overcommit::default(),
            system_reserve_percent: 15.0,
            ha_pattern: HaPattern::None,
        }
    }
}

impl PolicySettings {
    /// Replica count clamped to the configured bounds; unset means one replica
    pub fn replicas_for(&self, environment: EnvironmentKind, bounds: (u32, u32)) -> u32 {
        let (min, max) = bounds;
        self.replicas
            .get(&environment)
            .copied()
            .unwrap_or(1)
            .clamp(min, max.max(min))
    }

    /// Effective headroom; zero when headroom is disabled or unset
    pub fn headroom_for(&self, environment: EnvironmentKind) -> f64 {
        if !self.headroom_enabled {
            return 0.0;
        }
        self.headroom_percent
            .get(&environment)
            .copied()
            .unwrap_or(0.0)
            .clamp(0.0, 100.0)
    }

    pub fn overcommit_for(&self, environment: EnvironmentKind) -> Overcommit {
        if environment.is_production_like() {
            self.prod_overcommit
        } else {
            self.nonprod_overcommit
        }
    }

    /// Fraction of node capacity left for workloads
    pub fn allocatable_fraction(&self) -> f64 {
        1.0 - self.system_reserve_percent / 100.0
    }
}

/// Engine-wide sizing constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CalculatorSettings {
    #[validate(range(min = 1))]
    pub min_worker_nodes: u32,
    #[validate(range(min = 1))]
    pub managed_min_worker_nodes: u32,
    #[validate(range(min = 1))]
    pub apps_per_infra_node: u32,
    pub min_infra_nodes: u32,
    pub min_nonprod_infra_nodes: u32,
    pub max_infra_nodes: u32,
    /// Apps above which a production deployment counts as large
    pub large_deployment_app_threshold: u32,
    pub min_prod_infra_large: u32,
    /// Workers above which the control plane grows to five nodes
    pub large_cluster_worker_threshold: u32,
    #[validate(range(min = 1))]
    pub min_replicas: u32,
    #[validate(range(min = 1, max = 100))]
    pub max_replicas: u32,
    #[validate(range(min = 1))]
    pub apps_per_database_server: u32,
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            min_worker_nodes: 3,
            managed_min_worker_nodes: 2,
            apps_per_infra_node: 15,
            min_infra_nodes: 3,
            min_nonprod_infra_nodes: 2,
            max_infra_nodes: 10,
            large_deployment_app_threshold: 50,
            min_prod_infra_large: 5,
            large_cluster_worker_threshold: 100,
            min_replicas: 1,
            max_replicas: 10,
            apps_per_database_server: 10,
        }
    }
}

impl CalculatorSettings {
    pub fn replica_bounds(&self) -> (u32, u32) {
        (self.min_replicas, self.max_replicas)
    }

    /// Infra node bounds for an environment and app count
    pub fn infra_bounds(&self, environment: EnvironmentKind, apps: u32) -> (u32, u32) {
        let min = if !environment.is_production_like() {
            self.min_nonprod_infra_nodes
        } else if apps > self.large_deployment_app_threshold {
            self.min_prod_infra_large.max(self.min_infra_nodes)
        } else {
            self.min_infra_nodes
        };
        (min, self.max_infra_nodes.max(min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicas_are_clamped() {
        let mut policy = PolicySettings::default();
        policy.replicas.insert(EnvironmentKind::Prod, 25);
        policy.replicas.insert(EnvironmentKind::Dev, 0);

        assert_eq!(policy.replicas_for(EnvironmentKind::Prod, (1, 10)), 10);
        assert_eq!(policy.replicas_for(EnvironmentKind::Dev, (1, 10)), 1);
        policy.replicas.clear();
        assert_eq!(policy.replicas_for(EnvironmentKind::Stage, (1, 10)), 1);
    }

    #[test]
    fn test_headroom_disabled_forces_zero() {
        let mut policy = PolicySettings::default();
        assert_eq!(policy.headroom_for(EnvironmentKind::Prod), 30.0);

        policy.headroom_enabled = false;
        for env in [EnvironmentKind::Dev, EnvironmentKind::Prod, EnvironmentKind::DR] {
            assert_eq!(policy.headroom_for(env), 0.0);
        }
    }

    #[test]
    fn test_overcommit_by_class() {
        let policy = PolicySettings {
            prod_overcommit: Overcommit { cpu: 1.5, ram: 1.0 },
            nonprod_overcommit: Overcommit { cpu: 4.0, ram: 2.0 },
            ..Default::default()
        };
        assert_eq!(policy.overcommit_for(EnvironmentKind::DR).cpu, 1.5);
        assert_eq!(policy.overcommit_for(EnvironmentKind::Test).ram, 2.0);
    }

    #[test]
    fn test_overcommit_bounds_are_validated() {
        let policy = PolicySettings {
            prod_overcommit: Overcommit { cpu: 12.0, ram: 1.0 },
            ..Default::default()
        };
        assert!(policy.validate().is_err());
        assert!(PolicySettings::default().validate().is_ok());
    }

    #[test]
    fn test_ha_pattern_replicas_and_spares() {
        assert_eq!(HaPattern::ActiveActive.effective_replicas(1), 2);
        assert_eq!(HaPattern::ActivePassive.effective_replicas(3), 6);
        assert_eq!(HaPattern::None.effective_replicas(3), 3);
        assert_eq!(HaPattern::NPlusTwo.spare_workers(), 2);
        assert_eq!(HaPattern::ActiveActive.spare_workers(), 0);
    }

    #[test]
    fn test_infra_bounds() {
        let settings = CalculatorSettings::default();
        assert_eq!(settings.infra_bounds(EnvironmentKind::Prod, 60), (5, 10));
        assert_eq!(settings.infra_bounds(EnvironmentKind::Prod, 20), (3, 10));
        assert_eq!(settings.infra_bounds(EnvironmentKind::Dev, 60), (2, 10));
        assert!(settings.validate().is_ok());
    }
}
