use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use validator::Validate;

use super::catalog::{CloudProvider, ProviderProfile};
use super::{
    BACKUP_STORAGE_RATIO, Breakdown, CostCategory, CostLineItem, Currency, HOURS_PER_MONTH,
    PricingType,
};
use crate::error::ConfigurationError;
use crate::sizing::{NodeClass, SizingOutcome};

/// Cloud pricing selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CloudPricing {
    pub provider: CloudProvider,
    /// Provider's reference region when absent
    pub region: Option<String>,
    pub pricing_type: PricingType,
    pub currency: Currency,
    /// Explicit instance type per node class; others are picked from the catalog
    pub instance_types: BTreeMap<NodeClass, String>,
    #[validate(range(min = 0.0))]
    pub egress_gb_per_month: f64,
    pub load_balancers_per_environment: u32,
    /// Platform subscription billed per worker core
    #[validate(range(min = 0.0))]
    pub license_per_core_month: f64,
    /// Support plan as a share of all other categories
    #[validate(range(min = 0.0, max = 100.0))]
    pub support_percent: f64,
}

impl Default for CloudPricing {
    fn default() -> Self {
        Self {
            provider: CloudProvider::Aws,
            region: None,
            pricing_type: PricingType::OnDemand,
            currency: Currency::Usd,
            instance_types: BTreeMap::new(),
            egress_gb_per_month: 0.0,
            load_balancers_per_environment: 1,
            license_per_core_month: 0.0,
            support_percent: 0.0,
        }
    }
}

impl CloudPricing {
    pub fn for_provider(provider: CloudProvider) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }
}

pub(super) fn price(
    profile: &ProviderProfile,
    pricing: &CloudPricing,
    sizing: &SizingOutcome,
) -> Result<Breakdown, ConfigurationError> {
    let region = pricing
        .region
        .clone()
        .unwrap_or_else(|| profile.default_region.clone());
    let region_factor = profile.region_multiplier(&region);
    let term_factor = profile.term_factor(pricing.pricing_type);
    let mut breakdown = Breakdown::new(
        profile.provider.to_string(),
        region,
        pricing.pricing_type,
        pricing.currency,
    );

    let mut storage_gb = 0.0;
    let mut backup_gb = 0.0;
    let mut worker_cores = 0.0;
    let mut clusters = 0u32;

    for env in &sizing.environments {
        let multiplier = env.ha_dr.cost_multiplier_for(profile);
        debug!(environment = %env.environment, multiplier, "Pricing environment");

        for group in &env.node_groups {
            let (instance, hourly_rate) = match pricing.instance_types.get(&group.class) {
                Some(name) => (name.clone(), profile.hourly_rate(name)),
                None => {
                    let instance = profile.instance_for(&group.spec)?;
                    (instance.name.clone(), instance.hourly_rate)
                }
            };
            let node_monthly = hourly_rate * HOURS_PER_MONTH * region_factor * term_factor;
            breakdown.push(
                CostCategory::Compute,
                CostLineItem::new(
                    format!("{} {} ({instance}, x{multiplier:.2})", env.environment, group.label),
                    f64::from(group.count),
                    node_monthly * multiplier,
                ),
            );
        }

        if sizing.managed_control_plane {
            let billable = clusters >= profile.control_plane.free_clusters;
            clusters += 1;
            if billable && profile.control_plane.hourly_rate > 0.0 {
                breakdown.push(
                    CostCategory::Compute,
                    CostLineItem::new(
                        format!("{} managed control plane", env.environment),
                        1.0,
                        profile.control_plane.hourly_rate * HOURS_PER_MONTH * multiplier,
                    ),
                );
            }
        }

        storage_gb += env.total_disk_gb;
        if env.ha_dr.stores_backups() {
            backup_gb += env.total_disk_gb * BACKUP_STORAGE_RATIO;
        }
        worker_cores += env.class_total(NodeClass::Worker).cpu;
    }

    breakdown.push(
        CostCategory::Storage,
        CostLineItem::new(
            "Block storage (GB)",
            storage_gb,
            profile.storage_gb_month * region_factor,
        ),
    );
    if backup_gb > 0.0 {
        breakdown.push(
            CostCategory::Storage,
            CostLineItem::new("Backup snapshots (GB)", backup_gb, profile.snapshot_gb_month),
        );
    }

    let load_balancers = sizing.environments.len() as u32 * pricing.load_balancers_per_environment;
    if load_balancers > 0 {
        breakdown.push(
            CostCategory::Network,
            CostLineItem::new(
                "Load balancers",
                f64::from(load_balancers),
                profile.load_balancer_hourly * HOURS_PER_MONTH * region_factor,
            ),
        );
    }
    if pricing.egress_gb_per_month > 0.0 {
        breakdown.push(
            CostCategory::Network,
            CostLineItem::new(
                "Data egress (GB)",
                pricing.egress_gb_per_month,
                profile.egress_per_gb,
            ),
        );
    }

    if pricing.license_per_core_month > 0.0 && worker_cores > 0.0 {
        breakdown.push(
            CostCategory::License,
            CostLineItem::new(
                "Platform subscription (worker cores)",
                worker_cores,
                pricing.license_per_core_month,
            ),
        );
    }

    if pricing.support_percent > 0.0 {
        let base = breakdown.total();
        breakdown.push(
            CostCategory::Support,
            CostLineItem::new(
                format!("Support plan ({}%)", pricing.support_percent),
                1.0,
                base * pricing.support_percent / 100.0,
            ),
        );
    }

    Ok(breakdown)
}
