use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Breakdown, CostCategory, CostLineItem, Currency, PricingType};
use crate::sizing::SizingOutcome;

/// Cost basis for self-hosted hardware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OnPremCostBasis {
    /// Label reported as the estimate's region
    pub site: String,
    pub currency: Currency,
    #[validate(range(min = 0.0))]
    pub hardware_cost_per_node: f64,
    #[validate(range(min = 1))]
    pub amortization_months: u32,
    /// Power, cooling and rack space
    #[validate(range(min = 0.0))]
    pub facilities_per_node_month: f64,
    #[validate(range(min = 0.0))]
    pub storage_per_gb_month: f64,
    #[validate(range(min = 0.0))]
    pub network_per_node_month: f64,
    #[validate(range(min = 0.0))]
    pub license_per_node_month: f64,
    /// Platform engineers, in full-time equivalents
    #[validate(range(min = 0.0))]
    pub engineers: f64,
    #[validate(range(min = 0.0))]
    pub engineer_monthly_cost: f64,
}

impl Default for OnPremCostBasis {
    fn default() -> Self {
        Self {
            site: "datacenter".to_string(),
            currency: Currency::Usd,
            hardware_cost_per_node: 12_000.0,
            amortization_months: 36,
            facilities_per_node_month: 150.0,
            storage_per_gb_month: 0.05,
            network_per_node_month: 25.0,
            license_per_node_month: 0.0,
            engineers: 2.0,
            engineer_monthly_cost: 12_500.0,
        }
    }
}

pub(super) fn price(basis: &OnPremCostBasis, sizing: &SizingOutcome) -> Breakdown {
    let nodes = f64::from(sizing.grand_total.total_nodes);
    let mut breakdown =
        Breakdown::new("on-prem", basis.site.clone(), PricingType::OnDemand, basis.currency);

    breakdown.push(
        CostCategory::Compute,
        CostLineItem::new(
            format!("Hardware amortisation over {} months", basis.amortization_months),
            nodes,
            basis.hardware_cost_per_node / f64::from(basis.amortization_months.max(1)),
        ),
    );
    breakdown.push(
        CostCategory::Compute,
        CostLineItem::new("Facilities", nodes, basis.facilities_per_node_month),
    );
    breakdown.push(
        CostCategory::Storage,
        CostLineItem::new(
            "Primary storage (GB)",
            sizing.grand_total.total_disk_gb,
            basis.storage_per_gb_month,
        ),
    );
    breakdown.push(
        CostCategory::Network,
        CostLineItem::new("Network ports", nodes, basis.network_per_node_month),
    );
    if basis.license_per_node_month > 0.0 {
        breakdown.push(
            CostCategory::License,
            CostLineItem::new("Platform subscription", nodes, basis.license_per_node_month),
        );
    }
    breakdown.push(
        CostCategory::Support,
        CostLineItem::new("Platform engineering", basis.engineers, basis.engineer_monthly_cost),
    );

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AppTierCounts;
    use crate::resource_specs::DistributionKind;
    use crate::sizing::{SizingCalculator, SizingInput};

    fn sizing() -> SizingOutcome {
        let input = SizingInput::production_only(
            DistributionKind::Kubernetes,
            AppTierCounts::new(1, 0, 0, 0),
        );
        SizingCalculator::default().compute(&input).unwrap()
    }

    #[test]
    fn test_on_prem_components() {
        let sizing = sizing();
        // 3 masters + 3 workers
        assert_eq!(sizing.grand_total.total_nodes, 6);

        let breakdown = price(&OnPremCostBasis::default(), &sizing);
        let expected = 6.0 * (12_000.0 / 36.0 + 150.0);
        assert!((breakdown.subtotal(CostCategory::Compute) - expected).abs() < 1e-6);
        assert_eq!(breakdown.subtotal(CostCategory::Network), 150.0);
        assert_eq!(breakdown.subtotal(CostCategory::License), 0.0);
        assert_eq!(breakdown.subtotal(CostCategory::Support), 25_000.0);
    }

    #[test]
    fn test_zero_amortisation_is_rejected() {
        let basis = OnPremCostBasis {
            amortization_months: 0,
            ..Default::default()
        };
        assert!(basis.validate().is_err());
    }
}
