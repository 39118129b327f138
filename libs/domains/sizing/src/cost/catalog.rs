//! Built-in cloud provider rate cards.
//!
//! Rates are list on-demand USD prices for a reference region; other
//! regions apply a multiplier. Unknown instance types and regions degrade
//! to documented defaults instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

use crate::error::ConfigurationError;
use crate::ha_dr::CrossAzRate;
use crate::resource_specs::NodeSpec;
use crate::tiered::TierTable;

use super::PricingType;

/// Cloud provider enumeration
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    Aws,
    Azure,
    Gcp,
}

/// A purchasable instance size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    pub cpu: f64,
    pub ram_gb: f64,
    pub hourly_rate: f64,
}

impl InstanceType {
    fn new(name: &str, cpu: f64, ram_gb: f64, hourly_rate: f64) -> Self {
        Self {
            name: name.to_string(),
            cpu,
            ram_gb,
            hourly_rate,
        }
    }

    pub fn fits(&self, spec: &NodeSpec) -> bool {
        self.cpu >= spec.cpu && self.ram_gb >= spec.ram_gb
    }
}

/// Managed control-plane fee
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPlanePricing {
    pub hourly_rate: f64,
    /// Clusters per account that pay no control-plane fee
    pub free_clusters: u32,
}

/// Rate card of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: CloudProvider,
    /// General-purpose family keyed by vCPU count
    pub general_purpose: TierTable<InstanceType>,
    /// Memory-optimised family keyed by RAM
    pub memory_optimized: TierTable<InstanceType>,
    /// Rate used for instance types missing from the card
    pub default_hourly_rate: f64,
    pub default_region: String,
    pub region_multipliers: BTreeMap<String, f64>,
    pub control_plane: ControlPlanePricing,
    pub storage_gb_month: f64,
    pub snapshot_gb_month: f64,
    pub egress_per_gb: f64,
    pub load_balancer_hourly: f64,
    pub cross_az_rate: f64,
    pub reserved_1yr_factor: f64,
    pub reserved_3yr_factor: f64,
}

impl CrossAzRate for ProviderProfile {
    fn cross_az_rate(&self) -> f64 {
        self.cross_az_rate
    }
}

impl ProviderProfile {
    fn instances(&self) -> impl Iterator<Item = &InstanceType> {
        self.general_purpose
            .tiers()
            .iter()
            .chain(self.memory_optimized.tiers())
            .map(|tier| &tier.price)
    }

    pub fn instance(&self, name: &str) -> Option<&InstanceType> {
        self.instances().find(|i| i.name == name)
    }

    /// Hourly rate of a named instance type, or the provider default
    pub fn hourly_rate(&self, name: &str) -> f64 {
        match self.instance(name) {
            Some(instance) => instance.hourly_rate,
            None => {
                warn!(
                    provider = %self.provider,
                    instance_type = name,
                    default_rate = self.default_hourly_rate,
                    "Unknown instance type, using default rate"
                );
                self.default_hourly_rate
            }
        }
    }

    /// Smallest general-purpose size covering the spec's vCPUs, switching
    /// to the memory-optimised family when RAM does not fit. Specs above
    /// the largest size resolve to the largest size.
    pub fn instance_for(&self, spec: &NodeSpec) -> Result<&InstanceType, ConfigurationError> {
        let general = self
            .general_purpose
            .require(spec.cpu, &format!("{} general-purpose instances", self.provider))?;
        if general.fits(spec) {
            return Ok(general);
        }
        match self.memory_optimized.resolve(spec.ram_gb) {
            Some(memory) if memory.fits(spec) => Ok(memory),
            _ => Ok(general),
        }
    }

    pub fn region_multiplier(&self, region: &str) -> f64 {
        match self.region_multipliers.get(region) {
            Some(multiplier) => *multiplier,
            None => {
                warn!(provider = %self.provider, region, "Unknown region, using list price");
                1.0
            }
        }
    }

    pub fn term_factor(&self, pricing_type: PricingType) -> f64 {
        match pricing_type {
            PricingType::OnDemand => 1.0,
            PricingType::Reserved1Yr => self.reserved_1yr_factor,
            PricingType::Reserved3Yr => self.reserved_3yr_factor,
        }
    }
}

fn family(instances: Vec<InstanceType>, key: fn(&InstanceType) -> f64) -> TierTable<InstanceType> {
    TierTable::from_pairs(instances.into_iter().map(|i| (Some(key(&i)), i)))
}

fn regions(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(r, m)| (r.to_string(), *m)).collect()
}

impl ProviderProfile {
    pub fn aws() -> Self {
        Self {
            provider: CloudProvider::Aws,
            general_purpose: family(
                vec![
                    InstanceType::new("m6i.large", 2.0, 8.0, 0.096),
                    InstanceType::new("m6i.xlarge", 4.0, 16.0, 0.192),
                    InstanceType::new("m6i.2xlarge", 8.0, 32.0, 0.384),
                    InstanceType::new("m6i.4xlarge", 16.0, 64.0, 0.768),
                    InstanceType::new("m6i.8xlarge", 32.0, 128.0, 1.536),
                    InstanceType::new("m6i.16xlarge", 64.0, 256.0, 3.072),
                ],
                |i| i.cpu,
            ),
            memory_optimized: family(
                vec![
                    InstanceType::new("r6i.large", 2.0, 16.0, 0.126),
                    InstanceType::new("r6i.xlarge", 4.0, 32.0, 0.252),
                    InstanceType::new("r6i.2xlarge", 8.0, 64.0, 0.504),
                    InstanceType::new("r6i.4xlarge", 16.0, 128.0, 1.008),
                    InstanceType::new("r6i.8xlarge", 32.0, 256.0, 2.016),
                ],
                |i| i.ram_gb,
            ),
            default_hourly_rate: 0.192,
            default_region: "us-east-1".to_string(),
            region_multipliers: regions(&[
                ("us-east-1", 1.0),
                ("us-east-2", 1.0),
                ("us-west-2", 1.0),
                ("us-west-1", 1.12),
                ("eu-west-1", 1.07),
                ("eu-central-1", 1.15),
                ("ap-southeast-1", 1.2),
            ]),
            // EKS $0.10/hr per cluster
            control_plane: ControlPlanePricing {
                hourly_rate: 0.10,
                free_clusters: 0,
            },
            storage_gb_month: 0.08,
            snapshot_gb_month: 0.05,
            egress_per_gb: 0.09,
            load_balancer_hourly: 0.0225,
            cross_az_rate: 0.015,
            reserved_1yr_factor: 0.63,
            reserved_3yr_factor: 0.43,
        }
    }

    pub fn azure() -> Self {
        Self {
            provider: CloudProvider::Azure,
            general_purpose: family(
                vec![
                    InstanceType::new("Standard_D2s_v5", 2.0, 8.0, 0.096),
                    InstanceType::new("Standard_D4s_v5", 4.0, 16.0, 0.192),
                    InstanceType::new("Standard_D8s_v5", 8.0, 32.0, 0.384),
                    InstanceType::new("Standard_D16s_v5", 16.0, 64.0, 0.768),
                    InstanceType::new("Standard_D32s_v5", 32.0, 128.0, 1.536),
                    InstanceType::new("Standard_D64s_v5", 64.0, 256.0, 3.072),
                ],
                |i| i.cpu,
            ),
            memory_optimized: family(
                vec![
                    InstanceType::new("Standard_E2s_v5", 2.0, 16.0, 0.126),
                    InstanceType::new("Standard_E4s_v5", 4.0, 32.0, 0.252),
                    InstanceType::new("Standard_E8s_v5", 8.0, 64.0, 0.504),
                    InstanceType::new("Standard_E16s_v5", 16.0, 128.0, 1.008),
                    InstanceType::new("Standard_E32s_v5", 32.0, 256.0, 2.016),
                ],
                |i| i.ram_gb,
            ),
            default_hourly_rate: 0.192,
            default_region: "eastus".to_string(),
            region_multipliers: regions(&[
                ("eastus", 1.0),
                ("eastus2", 1.0),
                ("westus2", 1.0),
                ("westeurope", 1.1),
                ("northeurope", 1.05),
            ]),
            // AKS free tier
            control_plane: ControlPlanePricing {
                hourly_rate: 0.0,
                free_clusters: 0,
            },
            storage_gb_month: 0.12,
            snapshot_gb_month: 0.05,
            egress_per_gb: 0.087,
            load_balancer_hourly: 0.025,
            cross_az_rate: 0.01,
            reserved_1yr_factor: 0.6,
            reserved_3yr_factor: 0.4,
        }
    }

    pub fn gcp() -> Self {
        Self {
            provider: CloudProvider::Gcp,
            general_purpose: family(
                vec![
                    InstanceType::new("n2-standard-2", 2.0, 8.0, 0.0971),
                    InstanceType::new("n2-standard-4", 4.0, 16.0, 0.1942),
                    InstanceType::new("n2-standard-8", 8.0, 32.0, 0.3885),
                    InstanceType::new("n2-standard-16", 16.0, 64.0, 0.7769),
                    InstanceType::new("n2-standard-32", 32.0, 128.0, 1.5539),
                    InstanceType::new("n2-standard-64", 64.0, 256.0, 3.1078),
                ],
                |i| i.cpu,
            ),
            memory_optimized: family(
                vec![
                    InstanceType::new("n2-highmem-2", 2.0, 16.0, 0.1310),
                    InstanceType::new("n2-highmem-4", 4.0, 32.0, 0.2620),
                    InstanceType::new("n2-highmem-8", 8.0, 64.0, 0.5241),
                    InstanceType::new("n2-highmem-16", 16.0, 128.0, 1.0481),
                    InstanceType::new("n2-highmem-32", 32.0, 256.0, 2.0962),
                ],
                |i| i.ram_gb,
            ),
            default_hourly_rate: 0.1942,
            default_region: "us-central1".to_string(),
            region_multipliers: regions(&[
                ("us-central1", 1.0),
                ("us-east1", 1.0),
                ("us-west1", 1.0),
                ("europe-west1", 1.1),
                ("europe-west2", 1.16),
            ]),
            // GKE $0.10/hr, first zonal cluster free
            control_plane: ControlPlanePricing {
                hourly_rate: 0.10,
                free_clusters: 1,
            },
            storage_gb_month: 0.10,
            snapshot_gb_month: 0.05,
            egress_per_gb: 0.12,
            load_balancer_hourly: 0.025,
            cross_az_rate: 0.01,
            reserved_1yr_factor: 0.63,
            reserved_3yr_factor: 0.45,
        }
    }
}

/// Rate cards by provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingCatalog {
    pub providers: BTreeMap<CloudProvider, ProviderProfile>,
}

impl Default for PricingCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingCatalog {
    pub fn builtin() -> Self {
        let providers = [ProviderProfile::aws(), ProviderProfile::azure(), ProviderProfile::gcp()]
            .into_iter()
            .map(|p| (p.provider, p))
            .collect();
        Self { providers }
    }

    pub fn empty() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    pub fn provider(
        &self,
        provider: CloudProvider,
    ) -> Result<&ProviderProfile, ConfigurationError> {
        self.providers
            .get(&provider)
            .ok_or_else(|| ConfigurationError::MissingPricingTable(format!("{provider} rate card")))
    }
}
