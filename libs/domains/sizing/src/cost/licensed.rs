//! Subscription pricing for licensed application platforms.
//!
//! Edition base, capacity packs, user-volume tiers, add-ons and services,
//! with one optional discount applied to a chosen scope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use validator::Validate;

use super::{Breakdown, CostCategory, CostLineItem, Currency, PricingType};
use crate::environment::EnvironmentKind;
use crate::error::{ConfigurationError, SizingError, SizingResult};
use crate::sizing::SizingOutcome;
use crate::tiered::{PackAllocation, TierTable, resolve_tier};

/// Capacity sold in fixed-size packs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CapacityPricing {
    #[validate(range(min = 1))]
    pub pack_size: u32,
    #[validate(range(min = 0.0))]
    pub price_per_pack_monthly: f64,
    /// Capacity units consumed by one production app
    #[validate(range(min = 1, max = 1_000_000))]
    pub units_per_app: u32,
    /// Overrides the app-derived requirement
    pub required_units: Option<u32>,
}

impl Default for CapacityPricing {
    fn default() -> Self {
        Self {
            pack_size: 150,
            price_per_pack_monthly: 0.0,
            units_per_app: 10,
            required_units: None,
        }
    }
}

/// User-volume tiers, each a flat monthly price
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPricing {
    pub users: u32,
    pub tiers: TierTable<f64>,
}

/// Optional feature toggled on or off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOn {
    pub name: String,
    pub monthly_price: f64,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

/// Professional service with region-specific flat rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub name: String,
    #[serde(default)]
    pub region_rates: BTreeMap<String, f64>,
    #[serde(default)]
    pub default_rate: Option<f64>,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl ServiceOffering {
    pub fn rate(&self, region: &str) -> Result<f64, ConfigurationError> {
        self.region_rates
            .get(region)
            .copied()
            .or(self.default_rate)
            .ok_or_else(|| ConfigurationError::MissingServiceRate {
                service: self.name.clone(),
                region: region.to_string(),
            })
    }
}

/// Percentage of the scope subtotal, or a fixed amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage(f64),
    Fixed(f64),
}

/// Subtotal a discount applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    #[default]
    Total,
    LicenseOnly,
    AddOnsOnly,
    ServicesOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    #[serde(default)]
    pub scope: DiscountScope,
}

/// Pre-discount subtotals per scope group
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeSubtotals {
    pub license: f64,
    pub add_ons: f64,
    pub services: f64,
}

impl ScopeSubtotals {
    pub fn total(&self) -> f64 {
        self.license + self.add_ons + self.services
    }

    pub fn for_scope(&self, scope: DiscountScope) -> f64 {
        match scope {
            DiscountScope::Total => self.total(),
            DiscountScope::LicenseOnly => self.license,
            DiscountScope::AddOnsOnly => self.add_ons,
            DiscountScope::ServicesOnly => self.services,
        }
    }
}

/// Discount amount, capped at the scope subtotal
pub fn discount_amount(discount: &Discount, subtotals: &ScopeSubtotals) -> f64 {
    let base = subtotals.for_scope(discount.scope).max(0.0);
    let raw = match discount.kind {
        DiscountKind::Percentage(percent) => base * percent.clamp(0.0, 100.0) / 100.0,
        DiscountKind::Fixed(amount) => amount.max(0.0),
    };
    raw.min(base)
}

impl Discount {
    /// Amount taken from each scope group; a Total discount is spread proportionally
    pub fn allocate(&self, subtotals: &ScopeSubtotals) -> ScopeSubtotals {
        let amount = discount_amount(self, subtotals);
        match self.scope {
            DiscountScope::Total => {
                let total = subtotals.total();
                if total <= 0.0 {
                    return ScopeSubtotals::default();
                }
                ScopeSubtotals {
                    license: amount * subtotals.license / total,
                    add_ons: amount * subtotals.add_ons / total,
                    services: amount * subtotals.services / total,
                }
            }
            DiscountScope::LicenseOnly => ScopeSubtotals {
                license: amount,
                ..Default::default()
            },
            DiscountScope::AddOnsOnly => ScopeSubtotals {
                add_ons: amount,
                ..Default::default()
            },
            DiscountScope::ServicesOnly => ScopeSubtotals {
                services: amount,
                ..Default::default()
            },
        }
    }
}

/// Licensing model of a low-code or application platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LicensedPlatformPricing {
    pub platform: String,
    pub edition: String,
    pub region: String,
    pub currency: Currency,
    #[validate(range(min = 0.0))]
    pub edition_base_monthly: f64,
    #[validate(nested)]
    pub capacity: CapacityPricing,
    pub users: UserPricing,
    pub add_ons: Vec<AddOn>,
    pub services: Vec<ServiceOffering>,
    pub discount: Option<Discount>,
}

impl Default for LicensedPlatformPricing {
    fn default() -> Self {
        Self {
            platform: "low-code".to_string(),
            edition: "standard".to_string(),
            region: "global".to_string(),
            currency: Currency::Usd,
            edition_base_monthly: 0.0,
            capacity: CapacityPricing::default(),
            users: UserPricing::default(),
            add_ons: Vec::new(),
            services: Vec::new(),
            discount: None,
        }
    }
}

pub(super) fn price(
    pricing: &LicensedPlatformPricing,
    sizing: &SizingOutcome,
) -> SizingResult<Breakdown> {
    let mut breakdown = Breakdown::new(
        pricing.platform.clone(),
        pricing.region.clone(),
        PricingType::OnDemand,
        pricing.currency,
    );

    let mut license = vec![CostLineItem::new(
        format!("{} edition", pricing.edition),
        1.0,
        pricing.edition_base_monthly,
    )];

    let production_apps = sizing
        .environment(EnvironmentKind::Prod)
        .map(|env| env.apps)
        .unwrap_or(0);
    let units = match pricing.capacity.required_units {
        Some(units) => units,
        None => production_apps
            .checked_mul(pricing.capacity.units_per_app)
            .ok_or_else(|| {
                SizingError::policy(
                    EnvironmentKind::Prod,
                    format!(
                        "{production_apps} apps x {} units exceeds the capacity unit range",
                        pricing.capacity.units_per_app
                    ),
                )
            })?,
    };
    let packs = PackAllocation::allocate(units, pricing.capacity.pack_size);
    debug!(units, packs = packs.packs, spare = packs.spare_units(), "Allocated capacity packs");
    license.push(CostLineItem::new(
        format!("Capacity packs ({units} units, {} per pack)", packs.pack_size),
        f64::from(packs.packs),
        pricing.capacity.price_per_pack_monthly,
    ));

    if pricing.users.users > 0 {
        let users = f64::from(pricing.users.users);
        let tier_price = resolve_tier(&pricing.users.tiers, users)
            .ok_or_else(|| ConfigurationError::MissingPricingTable("user tiers".to_string()))?;
        license.push(CostLineItem::new(
            format!("User tier ({} users)", pricing.users.users),
            1.0,
            tier_price,
        ));
    }

    let add_ons: Vec<CostLineItem> = pricing
        .add_ons
        .iter()
        .filter(|a| a.enabled)
        .map(|a| CostLineItem::new(format!("Add-on: {}", a.name), 1.0, a.monthly_price))
        .collect();

    let services = pricing
        .services
        .iter()
        .filter(|s| s.enabled)
        .map(|s| {
            s.rate(&pricing.region)
                .map(|rate| CostLineItem::new(format!("Service: {}", s.name), 1.0, rate))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let subtotals = ScopeSubtotals {
        license: license.iter().map(|i| i.amount).sum(),
        add_ons: add_ons.iter().map(|i| i.amount).sum(),
        services: services.iter().map(|i| i.amount).sum(),
    };

    for item in license.into_iter().chain(add_ons) {
        breakdown.push(CostCategory::License, item);
    }
    for item in services {
        breakdown.push(CostCategory::Support, item);
    }

    if let Some(discount) = &pricing.discount {
        let taken = discount.allocate(&subtotals);
        for (category, label, amount) in [
            (CostCategory::License, "Discount (license)", taken.license),
            (CostCategory::License, "Discount (add-ons)", taken.add_ons),
            (CostCategory::Support, "Discount (services)", taken.services),
        ] {
            if amount > 0.0 {
                breakdown.push(category, CostLineItem::new(label, 1.0, -amount));
            }
        }
    }

    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AppTierCounts;
    use crate::resource_specs::DistributionKind;
    use crate::sizing::{SizingCalculator, SizingInput};

    fn sizing(apps: u32) -> SizingOutcome {
        let input = SizingInput::production_only(
            DistributionKind::Kubernetes,
            AppTierCounts::new(apps, 0, 0, 0),
        );
        SizingCalculator::default().compute(&input).unwrap()
    }

    fn pricing() -> LicensedPlatformPricing {
        LicensedPlatformPricing {
            edition_base_monthly: 2_000.0,
            capacity: CapacityPricing {
                pack_size: 150,
                price_per_pack_monthly: 500.0,
                units_per_app: 10,
                required_units: None,
            },
            users: UserPricing {
                users: 250,
                tiers: TierTable::from_pairs([
                    (Some(100.0), 300.0),
                    (Some(1_000.0), 1_200.0),
                    (None, 4_000.0),
                ]),
            },
            add_ons: vec![
                AddOn {
                    name: "sentry".to_string(),
                    monthly_price: 400.0,
                    enabled: true,
                },
                AddOn {
                    name: "high availability".to_string(),
                    monthly_price: 900.0,
                    enabled: false,
                },
            ],
            services: vec![ServiceOffering {
                name: "onboarding".to_string(),
                region_rates: BTreeMap::from([("global".to_string(), 600.0)]),
                default_rate: None,
                enabled: true,
            }],
            ..Default::default()
        }
    }

    fn subtotals() -> ScopeSubtotals {
        ScopeSubtotals {
            license: 1_000.0,
            add_ons: 500.0,
            services: 500.0,
        }
    }

    #[test]
    fn test_fixed_discount_capped_at_scope() {
        let discount = Discount {
            kind: DiscountKind::Fixed(5_000.0),
            scope: DiscountScope::LicenseOnly,
        };
        assert_eq!(discount_amount(&discount, &subtotals()), 1_000.0);
    }

    #[test]
    fn test_percentage_discount_on_services() {
        let discount = Discount {
            kind: DiscountKind::Percentage(20.0),
            scope: DiscountScope::ServicesOnly,
        };
        assert_eq!(discount_amount(&discount, &subtotals()), 100.0);
    }

    #[test]
    fn test_total_discount_spread_proportionally() {
        let discount = Discount {
            kind: DiscountKind::Fixed(400.0),
            scope: DiscountScope::Total,
        };
        let taken = discount.allocate(&subtotals());
        assert_eq!(taken.license, 200.0);
        assert_eq!(taken.add_ons, 100.0);
        assert_eq!(taken.services, 100.0);
    }

    #[test]
    fn test_licensed_components() {
        // 20 apps x 10 units = 200 units -> 2 packs
        let breakdown = price(&pricing(), &sizing(20)).unwrap();
        let expected_license = 2_000.0 + 2.0 * 500.0 + 1_200.0 + 400.0;
        assert_eq!(breakdown.subtotal(CostCategory::License), expected_license);
        assert_eq!(breakdown.subtotal(CostCategory::Support), 600.0);
        assert_eq!(breakdown.subtotal(CostCategory::Compute), 0.0);
    }

    #[test]
    fn test_users_above_top_tier_use_top_price() {
        let mut pricing = pricing();
        pricing.users.users = 50_000;
        pricing.add_ons.clear();
        let breakdown = price(&pricing, &sizing(1)).unwrap();
        assert_eq!(breakdown.subtotal(CostCategory::License), 2_000.0 + 500.0 + 4_000.0);
    }

    #[test]
    fn test_missing_user_tiers_is_configuration_error() {
        let mut pricing = pricing();
        pricing.users.tiers = TierTable::default();
        let err = price(&pricing, &sizing(1)).unwrap_err();
        assert!(matches!(
            err,
            SizingError::Configuration(ConfigurationError::MissingPricingTable(_))
        ));
    }

    #[test]
    fn test_service_without_rate_is_configuration_error() {
        let mut pricing = pricing();
        pricing.region = "apac".to_string();
        let err = price(&pricing, &sizing(1)).unwrap_err();
        match err {
            SizingError::Configuration(ConfigurationError::MissingServiceRate {
                service,
                region,
            }) => {
                assert_eq!(service, "onboarding");
                assert_eq!(region, "apac");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discount_never_makes_scope_negative() {
        let mut pricing = pricing();
        pricing.discount = Some(Discount {
            kind: DiscountKind::Fixed(1_000_000.0),
            scope: DiscountScope::ServicesOnly,
        });
        let breakdown = price(&pricing, &sizing(20)).unwrap();
        assert_eq!(breakdown.subtotal(CostCategory::Support), 0.0);
        assert!(breakdown.subtotal(CostCategory::License) > 0.0);
    }

    #[test]
    fn test_explicit_units_override_apps() {
        let mut pricing = pricing();
        pricing.capacity.required_units = Some(1_000);
        pricing.users.users = 0;
        pricing.add_ons.clear();
        let breakdown = price(&pricing, &sizing(1)).unwrap();
        assert_eq!(breakdown.subtotal(CostCategory::License), 2_000.0 + 7.0 * 500.0);
    }

    #[test]
    fn test_unit_overflow_is_policy_violation() {
        let mut pricing = pricing();
        pricing.capacity.units_per_app = u32::MAX;
        let err = price(&pricing, &sizing(20)).unwrap_err();
        assert!(matches!(
            err,
            SizingError::PolicyViolation {
                environment: EnvironmentKind::Prod,
                ..
            }
        ));
    }

    #[test]
    fn test_units_per_app_range_is_validated() {
        let mut pricing = pricing();
        pricing.capacity.units_per_app = 100_000_000;
        assert!(pricing.validate().is_err());
        pricing.capacity.units_per_app = 0;
        assert!(pricing.validate().is_err());
        pricing.capacity.units_per_app = 10;
        assert!(pricing.validate().is_ok());
    }

    #[test]
    fn test_discount_serde_shape() {
        let discount: Discount = serde_json::from_str(
            r#"{"kind": {"type": "percentage", "value": 15.0}, "scope": "license_only"}"#,
        )
        .unwrap();
        assert_eq!(discount.kind, DiscountKind::Percentage(15.0));
        assert_eq!(discount.scope, DiscountScope::LicenseOnly);
    }
}
