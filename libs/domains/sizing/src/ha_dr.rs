//! HA/DR Cost Model
//!
//! Turns a high-availability / disaster-recovery posture into a
//! dimensionless multiplier on baseline compute cost. Every term is an
//! additive uplift over 1.0, so the result never depends on evaluation
//! order and never drops below 1.0.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Fraction of primary workers kept running for a warm standby site
pub const WARM_STANDBY_FRACTION: f64 = 0.5;
/// Fraction of primary workers kept running for a hot standby site
pub const HOT_STANDBY_FRACTION: f64 = 0.9;
/// Flat surcharge for multi-region on top of the provider cross-AZ rate
pub const MULTI_REGION_SURCHARGE: f64 = 0.17;

/// Control-plane redundancy mode
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
pub enum ControlPlaneHa {
    /// Provider operates the control plane
    Managed,
    Single,
    #[default]
    StackedHa,
    ExternalEtcd,
}

/// How nodes are spread across failure domains
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
pub enum NodeDistribution {
    #[default]
    SingleAz,
    DualAz,
    MultiAz,
    MultiRegion,
}

/// Disaster-recovery posture
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
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
pub enum DrPattern {
    #[default]
    None,
    BackupRestore,
    WarmStandby,
    HotStandby,
    ActiveActive,
}

impl DrPattern {
    fn uplift(&self) -> f64 {
        match self {
            DrPattern::None => 0.0,
            DrPattern::BackupRestore => 0.08,
            DrPattern::WarmStandby => 0.40,
            DrPattern::HotStandby => 0.90,
            DrPattern::ActiveActive => 1.10,
        }
    }

    /// Running nodes at the secondary site for a primary worker pool
    pub fn standby_nodes(&self, primary_workers: u32) -> u32 {
        let fraction = match self {
            DrPattern::None | DrPattern::BackupRestore => return 0,
            DrPattern::WarmStandby => WARM_STANDBY_FRACTION,
            DrPattern::HotStandby => HOT_STANDBY_FRACTION,
            DrPattern::ActiveActive => return primary_workers,
        };
        (f64::from(primary_workers) * fraction).ceil() as u32
    }
}

/// Backup tooling
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
pub enum BackupStrategy {
    #[default]
    None,
    Velero,
    Kasten,
    Portworx,
    CloudNative,
}

impl BackupStrategy {
    fn uplift(&self) -> f64 {
        match self {
            BackupStrategy::None => 0.0,
            BackupStrategy::Velero => 0.02,
            BackupStrategy::Kasten => 0.05,
            BackupStrategy::Portworx => 0.08,
            BackupStrategy::CloudNative => 0.03,
        }
    }
}

/// Provider knowledge the multiplier needs
pub trait CrossAzRate {
    /// Uplift per additional availability zone
    fn cross_az_rate(&self) -> f64;
}

/// HA/DR posture of one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaDrConfig {
    pub control_plane_ha: ControlPlaneHa,
    pub control_plane_nodes: u32,
    pub node_distribution: NodeDistribution,
    pub az_count: u32,
    pub dr_pattern: DrPattern,
    pub backup_strategy: BackupStrategy,
    pub backup_frequency_hours: u32,
    pub backup_retention_days: u32,
}

impl Default for HaDrConfig {
    fn default() -> Self {
        Self {
            control_plane_ha: ControlPlaneHa::StackedHa,
            control_plane_nodes: 3,
            node_distribution: NodeDistribution::SingleAz,
            az_count: 1,
            dr_pattern: DrPattern::None,
            backup_strategy: BackupStrategy::None,
            backup_frequency_hours: 24,
            backup_retention_days: 30,
        }
    }
}

impl HaDrConfig {
    /// Availability zones implied by the distribution mode
    pub fn effective_az_count(&self) -> u32 {
        match self.node_distribution {
            NodeDistribution::SingleAz => 1,
            NodeDistribution::DualAz => 2,
            NodeDistribution::MultiAz => self.az_count.max(3),
            NodeDistribution::MultiRegion => self.az_count.max(2),
        }
    }

    /// Same posture without a secondary site
    ///
    /// Used for non-production fallbacks and for the DR environment itself,
    /// which is the secondary site and must not carry standby again.
    pub fn without_dr_site(&self) -> Self {
        Self {
            dr_pattern: DrPattern::None,
            ..self.clone()
        }
    }

    /// Whether backups are stored, either by strategy or by DR pattern
    pub fn stores_backups(&self) -> bool {
        self.backup_strategy != BackupStrategy::None || self.dr_pattern == DrPattern::BackupRestore
    }

    fn control_plane_uplift(&self) -> f64 {
        let extra_nodes = f64::from(self.control_plane_nodes.saturating_sub(1));
        match self.control_plane_ha {
            ControlPlaneHa::Managed | ControlPlaneHa::Single => 0.0,
            ControlPlaneHa::StackedHa => 0.10 * extra_nodes,
            ControlPlaneHa::ExternalEtcd => 0.12 * extra_nodes + 0.15,
        }
    }

    fn distribution_uplift(&self, provider: Option<&dyn CrossAzRate>) -> f64 {
        let extra_zones = f64::from(self.effective_az_count().saturating_sub(1));
        match (self.node_distribution, provider) {
            (NodeDistribution::SingleAz, _) => 0.0,
            (NodeDistribution::DualAz, None) => 0.02,
            (NodeDistribution::MultiAz, None) => 0.03 + 0.01 * (extra_zones - 2.0),
            (NodeDistribution::MultiRegion, None) => 0.20,
            (NodeDistribution::DualAz | NodeDistribution::MultiAz, Some(p)) => {
                p.cross_az_rate() * extra_zones
            }
            (NodeDistribution::MultiRegion, Some(p)) => {
                p.cross_az_rate() * extra_zones + MULTI_REGION_SURCHARGE
            }
        }
    }

    fn resilience_uplift(&self) -> f64 {
        match self.dr_pattern {
            DrPattern::None => self.backup_strategy.uplift(),
            pattern => pattern.uplift(),
        }
    }

    /// Provider-agnostic multiplier
    pub fn cost_multiplier(&self) -> f64 {
        multiplier(self, None)
    }

    /// Multiplier using the provider's cross-AZ rate
    pub fn cost_multiplier_for(&self, provider: &dyn CrossAzRate) -> f64 {
        multiplier(self, Some(provider))
    }
}

/// Compute-cost multiplier for an HA/DR posture; always ≥ 1.0
pub fn multiplier(config: &HaDrConfig, provider: Option<&dyn CrossAzRate>) -> f64 {
    let uplift = config.control_plane_uplift()
        + config.distribution_uplift(provider)
        + config.resilience_uplift();
    (1.0 + uplift).max(1.0)
}
