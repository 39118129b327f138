//! Cost Estimator
//!
//! Prices a [`SizingOutcome`] under one pricing context and assembles the
//! category and per-environment breakdown.
//!
//! ```text
//! SizingOutcome ──► OnPrem   ─┐
//!               ──► Cloud    ─┼─► Breakdown ──► CostEstimate
//!               ──► Licensed ─┘   (categories, environments)
//! ```

mod catalog;
mod cloud;
mod licensed;
mod on_prem;

pub use catalog::{
    CloudProvider, ControlPlanePricing, InstanceType, PricingCatalog, ProviderProfile,
};
pub use cloud::CloudPricing;
pub use licensed::{
    AddOn, CapacityPricing, Discount, DiscountKind, DiscountScope, LicensedPlatformPricing,
    ScopeSubtotals, ServiceOffering, UserPricing, discount_amount,
};
pub use on_prem::OnPremCostBasis;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{info, instrument};
use validator::Validate;

use crate::environment::EnvironmentKind;
use crate::error::SizingResult;
use crate::sizing::SizingOutcome;

/// Billing hours per month
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Backup snapshots are sized at half of primary storage
pub const BACKUP_STORAGE_RATIO: f64 = 0.5;

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cost category
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
pub enum CostCategory {
    Compute,
    Storage,
    Network,
    License,
    Support,
}

/// Currency enumeration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

/// Money with cent precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the smallest currency unit (cents)
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Rounds a decimal amount (e.g. 1.995 USD) to the nearest cent
    pub fn from_decimal(value: f64, currency: Currency) -> Self {
        Self {
            amount: (value * 100.0).round() as i64,
            currency,
        }
    }

    pub fn to_decimal(&self) -> f64 {
        self.amount as f64 / 100.0
    }

    pub fn times(self, factor: i64) -> Self {
        Self {
            amount: self.amount.saturating_mul(factor),
            currency: self.currency,
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money::new(self.amount.saturating_add(other.amount), self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let cents = self.amount.unsigned_abs();
        write!(f, "{sign}{}.{:02} {}", cents / 100, cents % 100, self.currency)
    }
}

/// Commitment term
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
pub enum PricingType {
    #[default]
    OnDemand,
    #[serde(rename = "reserved_1yr")]
    #[strum(serialize = "reserved_1yr")]
    Reserved1Yr,
    #[serde(rename = "reserved_3yr")]
    #[strum(serialize = "reserved_3yr")]
    Reserved3Yr,
}

/// Itemised cost: `amount = quantity × unit_price`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

impl CostLineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            amount: quantity * unit_price,
        }
    }
}

/// Monthly cost of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCost {
    pub category: CostCategory,
    pub monthly: f64,
    /// Share of the monthly total, 0 when the total is 0
    pub percentage: f64,
    pub line_items: Vec<CostLineItem>,
}

/// Share of the monthly cost carried by one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCost {
    pub environment: EnvironmentKind,
    pub monthly_cost: f64,
    pub percentage: f64,
    pub nodes: u32,
    pub cpu: f64,
    pub ram_gb: f64,
    pub disk_gb: f64,
}

impl EnvironmentCost {
    pub fn cost_per_node(&self) -> f64 {
        if self.nodes == 0 {
            0.0
        } else {
            self.monthly_cost / f64::from(self.nodes)
        }
    }
}

/// How the monthly total is split across environments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "weights", rename_all = "snake_case")]
pub enum EnvironmentWeighting {
    /// Proportional to each environment's node count
    #[default]
    ByNodes,
    /// Caller-supplied weights; missing environments weigh 0
    Custom(BTreeMap<EnvironmentKind, f64>),
}

impl EnvironmentWeighting {
    fn weights(&self, sizing: &SizingOutcome) -> Vec<f64> {
        sizing
            .environments
            .iter()
            .map(|env| match self {
                EnvironmentWeighting::ByNodes => f64::from(env.total_nodes),
                EnvironmentWeighting::Custom(weights) => {
                    weights.get(&env.environment).copied().unwrap_or(0.0).max(0.0)
                }
            })
            .collect()
    }
}

/// Priced estimate with breakdowns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub provider: String,
    pub region: String,
    pub pricing_type: PricingType,
    pub currency: Currency,
    pub monthly_total: f64,
    pub categories: Vec<CategoryCost>,
    pub environments: Vec<EnvironmentCost>,
}

impl CostEstimate {
    /// Monthly total in whole cents
    pub fn monthly_money(&self) -> Money {
        Money::from_decimal(self.monthly_total, self.currency)
    }

    pub fn yearly_money(&self) -> Money {
        self.monthly_money().times(12)
    }

    pub fn yearly_total(&self) -> f64 {
        self.monthly_total * 12.0
    }

    pub fn three_year_tco(&self) -> f64 {
        self.yearly_total() * 3.0
    }

    pub fn five_year_tco(&self) -> f64 {
        self.yearly_total() * 5.0
    }

    pub fn category(&self, category: CostCategory) -> Option<&CategoryCost> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn environment(&self, environment: EnvironmentKind) -> Option<&EnvironmentCost> {
        self.environments.iter().find(|e| e.environment == environment)
    }

    /// Monthly cost per priced node across all environments
    pub fn cost_per_node(&self) -> f64 {
        let nodes: u32 = self.environments.iter().map(|e| e.nodes).sum();
        if nodes == 0 {
            0.0
        } else {
            self.monthly_total / f64::from(nodes)
        }
    }
}

/// Pricing source for an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingContext {
    OnPrem(OnPremCostBasis),
    Cloud(CloudPricing),
    Licensed(LicensedPlatformPricing),
}

impl PricingContext {
    pub fn kind(&self) -> &'static str {
        match self {
            PricingContext::OnPrem(_) => "on_prem",
            PricingContext::Cloud(_) => "cloud",
            PricingContext::Licensed(_) => "licensed",
        }
    }
}

/// Line items collected per category before totals are computed
#[derive(Debug)]
pub(crate) struct Breakdown {
    provider: String,
    region: String,
    pricing_type: PricingType,
    currency: Currency,
    items: BTreeMap<CostCategory, Vec<CostLineItem>>,
}

impl Breakdown {
    pub(crate) fn new(
        provider: impl Into<String>,
        region: impl Into<String>,
        pricing_type: PricingType,
        currency: Currency,
    ) -> Self {
        Self {
            provider: provider.into(),
            region: region.into(),
            pricing_type,
            currency,
            items: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, category: CostCategory, item: CostLineItem) {
        self.items.entry(category).or_default().push(item);
    }

    pub(crate) fn subtotal(&self, category: CostCategory) -> f64 {
        self.items
            .get(&category)
            .map(|items| items.iter().map(|i| i.amount).sum())
            .unwrap_or(0.0)
    }

    pub(crate) fn total(&self) -> f64 {
        CostCategory::iter().map(|c| self.subtotal(c)).sum()
    }

    pub(crate) fn finish(
        mut self,
        sizing: &SizingOutcome,
        weighting: &EnvironmentWeighting,
    ) -> CostEstimate {
        let currency = self.currency;
        let monthly: Vec<(CostCategory, Money)> = CostCategory::iter()
            .map(|c| (c, Money::from_decimal(self.subtotal(c), currency)))
            .collect();
        let total = monthly
            .iter()
            .fold(Money::new(0, currency), |acc, (_, amount)| acc + *amount);
        let monthly_total = total.to_decimal();

        let categories = monthly
            .into_iter()
            .map(|(category, amount)| CategoryCost {
                category,
                monthly: amount.to_decimal(),
                percentage: percentage_of(amount.to_decimal(), monthly_total),
                line_items: self.items.remove(&category).unwrap_or_default(),
            })
            .collect();

        let weights = weighting.weights(sizing);
        let total_weight: f64 = weights.iter().sum();
        let even_share = 1.0 / weights.len().max(1) as f64;
        let shares: Vec<f64> = weights
            .iter()
            .map(|weight| {
                // a cost with nothing to weigh it by is split evenly
                if total.amount <= 0 {
                    0.0
                } else if total_weight > 0.0 {
                    weight / total_weight
                } else {
                    even_share
                }
            })
            .collect();
        let environments = sizing
            .environments
            .iter()
            .zip(split_cents(total.amount, &shares))
            .zip(&shares)
            .map(|((env, cents), share)| EnvironmentCost {
                environment: env.environment,
                monthly_cost: Money::new(cents, currency).to_decimal(),
                percentage: round_cents(share * 100.0),
                nodes: env.total_nodes,
                cpu: env.total_cpu,
                ram_gb: env.total_ram_gb,
                disk_gb: env.total_disk_gb,
            })
            .collect();

        CostEstimate {
            provider: self.provider,
            region: self.region,
            pricing_type: self.pricing_type,
            currency: self.currency,
            monthly_total,
            categories,
            environments,
        }
    }
}

/// Largest-remainder split of `total` cents; the parts always add up to it
fn split_cents(total: i64, shares: &[f64]) -> Vec<i64> {
    let exact: Vec<f64> = shares.iter().map(|share| total as f64 * share).collect();
    let mut parts: Vec<i64> = exact.iter().map(|e| e.floor() as i64).collect();
    let remainder = total - parts.iter().sum::<i64>();

    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        let frac = |i: usize| exact[i] - parts[i] as f64;
        frac(b).total_cmp(&frac(a))
    });
    for &i in order.iter().take(remainder.max(0) as usize) {
        parts[i] += 1;
    }
    parts
}

fn percentage_of(amount: f64, total: f64) -> f64 {
    if total > 0.0 {
        round_cents(amount / total * 100.0)
    } else {
        0.0
    }
}

/// Prices sizing outcomes against a provider catalog
#[derive(Debug, Clone, Default)]
pub struct CostEstimator {
    catalog: PricingCatalog,
}

impl CostEstimator {
    pub fn new(catalog: PricingCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    /// Estimate with environments weighted by node count
    pub fn estimate(
        &self,
        sizing: &SizingOutcome,
        context: &PricingContext,
    ) -> SizingResult<CostEstimate> {
        self.estimate_weighted(sizing, context, &EnvironmentWeighting::ByNodes)
    }

    #[instrument(skip_all, fields(context = context.kind(), distribution = %sizing.distribution))]
    pub fn estimate_weighted(
        &self,
        sizing: &SizingOutcome,
        context: &PricingContext,
        weighting: &EnvironmentWeighting,
    ) -> SizingResult<CostEstimate> {
        let breakdown = match context {
            PricingContext::OnPrem(basis) => {
                basis.validate()?;
                on_prem::price(basis, sizing)
            }
            PricingContext::Cloud(pricing) => {
                pricing.validate()?;
                let profile = self.catalog.provider(pricing.provider)?;
                cloud::price(profile, pricing, sizing)?
            }
            PricingContext::Licensed(pricing) => {
                pricing.validate()?;
                licensed::price(pricing, sizing)?
            }
        };

        let estimate = breakdown.finish(sizing, weighting);
        info!(
            provider = %estimate.provider,
            region = %estimate.region,
            monthly_total = estimate.monthly_total,
            "Cost estimate complete"
        );
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AppTierCounts;
    use crate::resource_specs::DistributionKind;
    use crate::sizing::{SizingCalculator, SizingInput};
    use std::collections::BTreeSet;

    fn multi_env_sizing() -> SizingOutcome {
        let mut input = SizingInput::production_only(
            DistributionKind::Kubernetes,
            AppTierCounts::new(10, 5, 0, 0),
        );
        input.apps.non_production = Some(AppTierCounts::new(10, 5, 0, 0));
        input.enabled_environments =
            BTreeSet::from([EnvironmentKind::Dev, EnvironmentKind::Stage, EnvironmentKind::Prod]);
        SizingCalculator::default().compute(&input).unwrap()
    }

    fn on_prem() -> PricingContext {
        PricingContext::OnPrem(OnPremCostBasis::default())
    }

    #[test]
    fn test_yearly_and_tco_derive_from_monthly() {
        let estimate = CostEstimator::default()
            .estimate(&multi_env_sizing(), &on_prem())
            .unwrap();
        assert!(estimate.monthly_total > 0.0);
        assert_eq!(estimate.yearly_total(), estimate.monthly_total * 12.0);
        assert_eq!(estimate.three_year_tco(), estimate.yearly_total() * 3.0);
        assert_eq!(estimate.five_year_tco(), estimate.yearly_total() * 5.0);
    }

    #[test]
    fn test_category_percentages_sum_to_hundred() {
        let estimate = CostEstimator::default()
            .estimate(&multi_env_sizing(), &on_prem())
            .unwrap();
        let sum: f64 = estimate.categories.iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1, "sum = {sum}");
        assert_eq!(estimate.categories.len(), 5);
    }

    #[test]
    fn test_zero_total_has_zero_percentages() {
        let basis = OnPremCostBasis {
            hardware_cost_per_node: 0.0,
            facilities_per_node_month: 0.0,
            storage_per_gb_month: 0.0,
            network_per_node_month: 0.0,
            license_per_node_month: 0.0,
            engineers: 0.0,
            ..Default::default()
        };
        let estimate = CostEstimator::default()
            .estimate(&multi_env_sizing(), &PricingContext::OnPrem(basis))
            .unwrap();
        assert_eq!(estimate.monthly_total, 0.0);
        assert_eq!(estimate.yearly_total(), 0.0);
        assert!(estimate.categories.iter().all(|c| c.percentage == 0.0));
        assert!(estimate.environments.iter().all(|e| e.percentage == 0.0));
    }

    #[test]
    fn test_environments_share_cost_by_nodes() {
        let sizing = multi_env_sizing();
        let estimate = CostEstimator::default().estimate(&sizing, &on_prem()).unwrap();

        let sum: f64 = estimate.environments.iter().map(|e| e.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1, "sum = {sum}");

        let total_nodes = f64::from(sizing.grand_total.total_nodes);
        let prod = estimate.environment(EnvironmentKind::Prod).unwrap();
        let expected = f64::from(prod.nodes) / total_nodes * 100.0;
        assert!((prod.percentage - expected).abs() < 0.01);
    }

    #[test]
    fn test_custom_weighting() {
        let weighting = EnvironmentWeighting::Custom(BTreeMap::from([
            (EnvironmentKind::Prod, 3.0),
            (EnvironmentKind::Stage, 1.0),
        ]));
        let estimate = CostEstimator::default()
            .estimate_weighted(&multi_env_sizing(), &on_prem(), &weighting)
            .unwrap();
        assert_eq!(estimate.environment(EnvironmentKind::Prod).unwrap().percentage, 75.0);
        assert_eq!(estimate.environment(EnvironmentKind::Stage).unwrap().percentage, 25.0);
        let dev = estimate.environment(EnvironmentKind::Dev).unwrap();
        assert_eq!(dev.monthly_cost, 0.0);
        assert_eq!(dev.percentage, 0.0);
    }

    #[test]
    fn test_all_zero_custom_weights_split_evenly() {
        let weighting = EnvironmentWeighting::Custom(BTreeMap::new());
        let estimate = CostEstimator::default()
            .estimate_weighted(&multi_env_sizing(), &on_prem(), &weighting)
            .unwrap();
        assert!(estimate.monthly_total > 0.0);

        let sum: f64 = estimate.environments.iter().map(|e| e.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1, "sum = {sum}");
        for env in &estimate.environments {
            assert_eq!(env.percentage, 33.33);
            assert!((env.monthly_cost - estimate.monthly_total / 3.0).abs() <= 0.01);
        }
    }

    #[test]
    fn test_nodeless_environments_still_carry_license_cost() {
        let mut input = SizingInput::production_only(
            DistributionKind::Kubernetes,
            AppTierCounts::default(),
        );
        input.cluster_mode = crate::sizing::ClusterMode::VirtualMachines;
        input.enabled_environments = BTreeSet::from([EnvironmentKind::Dev, EnvironmentKind::Prod]);
        let sizing = SizingCalculator::default().compute(&input).unwrap();
        assert_eq!(sizing.grand_total.total_nodes, 0);

        let context = PricingContext::Licensed(LicensedPlatformPricing {
            edition_base_monthly: 1_000.0,
            ..Default::default()
        });
        let estimate = CostEstimator::default().estimate(&sizing, &context).unwrap();
        assert_eq!(estimate.monthly_total, 1_000.0);
        for env in &estimate.environments {
            assert_eq!(env.percentage, 50.0);
            assert_eq!(env.monthly_cost, 500.0);
        }
    }

    #[test]
    fn test_cost_per_node_zero_nodes() {
        let env = EnvironmentCost {
            environment: EnvironmentKind::Dev,
            monthly_cost: 100.0,
            percentage: 0.0,
            nodes: 0,
            cpu: 0.0,
            ram_gb: 0.0,
            disk_gb: 0.0,
        };
        assert_eq!(env.cost_per_node(), 0.0);
        let env = EnvironmentCost { nodes: 4, ..env };
        assert_eq!(env.cost_per_node(), 25.0);
    }

    #[test]
    fn test_environment_costs_add_up_to_total_cents() {
        let weighting = EnvironmentWeighting::Custom(BTreeMap::from([
            (EnvironmentKind::Dev, 1.0),
            (EnvironmentKind::Stage, 1.0),
            (EnvironmentKind::Prod, 1.0),
        ]));
        let estimate = CostEstimator::default()
            .estimate_weighted(&multi_env_sizing(), &on_prem(), &weighting)
            .unwrap();

        let cents: i64 = estimate
            .environments
            .iter()
            .map(|e| Money::from_decimal(e.monthly_cost, estimate.currency).amount)
            .sum();
        assert_eq!(cents, estimate.monthly_money().amount);
    }

    #[test]
    fn test_split_cents_hands_out_remainder() {
        assert_eq!(split_cents(100, &[1.0 / 3.0; 3]), vec![34, 33, 33]);
        assert_eq!(split_cents(1_000, &[0.75, 0.25, 0.0]), vec![750, 250, 0]);
        assert_eq!(split_cents(0, &[0.0, 0.0]), vec![0, 0]);
    }

    #[test]
    fn test_money_cents() {
        let price = Money::from_decimal(1_681.924, Currency::Usd);
        assert_eq!(price.amount, 168_192);
        assert_eq!(price.to_string(), "1681.92 USD");
        assert_eq!(price.times(12).amount, 2_018_304);
        assert_eq!((price + Money::new(8, Currency::Usd)).to_decimal(), 1_682.0);
        assert_eq!(Money::new(-5, Currency::Eur).to_string(), "-0.05 EUR");
    }

    #[test]
    fn test_yearly_money_is_exact() {
        let estimate = CostEstimator::default()
            .estimate(&multi_env_sizing(), &on_prem())
            .unwrap();
        assert_eq!(estimate.yearly_money().amount, estimate.monthly_money().amount * 12);
        assert!((estimate.yearly_money().to_decimal() - estimate.yearly_total()).abs() < 0.01);
    }

    #[test]
    fn test_line_item_amount() {
        let item = CostLineItem::new("prod worker", 3.0, 560.64);
        assert!((item.amount - 1681.92).abs() < 1e-9);
    }

    #[test]
    fn test_pricing_context_serde_tag() {
        let json = serde_json::to_value(on_prem()).unwrap();
        assert_eq!(json["kind"], "on_prem");
        let back: PricingContext = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), "on_prem");
    }
}
