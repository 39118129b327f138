use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::cost::{
    CostEstimate, CostEstimator, EnvironmentWeighting, PricingCatalog, PricingContext,
};
use crate::error::SizingResult;
use crate::growth::{GrowthBaseline, GrowthProjection, GrowthProjector, GrowthSettings};
use crate::observability::{PlannerMetrics, PlannerTimer};
use crate::policy::CalculatorSettings;
use crate::sizing::{SizingCalculator, SizingInput, SizingOutcome};

/// Sizing, optional pricing and optional growth in one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlanRequest {
    #[validate(nested)]
    pub sizing: SizingInput,
    #[serde(default)]
    pub pricing: Option<PricingContext>,
    #[serde(default)]
    pub weighting: EnvironmentWeighting,
    #[serde(default)]
    #[validate(nested)]
    pub growth: Option<GrowthSettings>,
}

/// Combined engine output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub sizing: SizingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<GrowthProjection>,
}

/// Entry point wiring the calculator, estimator and projector together
#[derive(Debug, Clone, Default)]
pub struct PlannerService {
    calculator: SizingCalculator,
    estimator: CostEstimator,
    projector: GrowthProjector,
}

impl PlannerService {
    /// Create a new planner with explicit settings and rate cards
    pub fn new(settings: CalculatorSettings, catalog: PricingCatalog) -> Self {
        Self {
            calculator: SizingCalculator::new(settings),
            estimator: CostEstimator::new(catalog),
            projector: GrowthProjector::new(),
        }
    }

    pub fn settings(&self) -> &CalculatorSettings {
        self.calculator.settings()
    }

    pub fn catalog(&self) -> &PricingCatalog {
        self.estimator.catalog()
    }

    /// Validate and size the input
    pub fn size(&self, input: &SizingInput) -> SizingResult<SizingOutcome> {
        let _timer = PlannerTimer::new("sizing");
        self.calculator.settings().validate()?;
        input.validate()?;

        let outcome = self.calculator.compute(input).inspect_err(|err| {
            PlannerMetrics::record_sizing_failed(&err.to_string());
        })?;
        PlannerMetrics::record_sizing(&outcome);
        Ok(outcome)
    }

    /// Price a sizing outcome, weighting environments by node count
    pub fn estimate(
        &self,
        sizing: &SizingOutcome,
        context: &PricingContext,
    ) -> SizingResult<CostEstimate> {
        self.estimate_weighted(sizing, context, &EnvironmentWeighting::ByNodes)
    }

    pub fn estimate_weighted(
        &self,
        sizing: &SizingOutcome,
        context: &PricingContext,
        weighting: &EnvironmentWeighting,
    ) -> SizingResult<CostEstimate> {
        let _timer = PlannerTimer::new("estimate");
        let estimate = self.estimator.estimate_weighted(sizing, context, weighting)?;
        PlannerMetrics::record_estimate(&estimate);
        Ok(estimate)
    }

    /// Project growth from sizing and, when present, cost results
    pub fn project(
        &self,
        sizing: &SizingOutcome,
        cost: Option<&CostEstimate>,
        settings: &GrowthSettings,
    ) -> SizingResult<GrowthProjection> {
        let _timer = PlannerTimer::new("growth");
        let baseline = GrowthBaseline::from_results(sizing, cost);
        let projection = self.projector.project(&baseline, settings)?;
        PlannerMetrics::record_projection(&projection);
        Ok(projection)
    }

    /// Run every stage the request asks for; the first failure aborts the plan
    #[instrument(skip_all, fields(distribution = %request.sizing.distribution))]
    pub fn plan(&self, request: &PlanRequest) -> SizingResult<CapacityReport> {
        request.validate()?;

        let sizing = self.size(&request.sizing)?;
        let cost = request
            .pricing
            .as_ref()
            .map(|context| self.estimate_weighted(&sizing, context, &request.weighting))
            .transpose()?;
        let growth = request
            .growth
            .as_ref()
            .map(|settings| self.project(&sizing, cost.as_ref(), settings))
            .transpose()?;

        Ok(CapacityReport {
            sizing,
            cost,
            growth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CloudPricing, CloudProvider};
    use crate::environment::AppTierCounts;
    use crate::error::{ConfigurationError, SizingError};
    use crate::resource_specs::DistributionKind;

    fn request() -> PlanRequest {
        PlanRequest {
            sizing: SizingInput::production_only(
                DistributionKind::Eks,
                AppTierCounts::new(10, 5, 0, 0),
            ),
            pricing: Some(PricingContext::Cloud(CloudPricing::for_provider(CloudProvider::Aws))),
            weighting: EnvironmentWeighting::ByNodes,
            growth: Some(GrowthSettings::default()),
        }
    }

    #[test]
    fn test_plan_runs_all_stages() {
        let report = PlannerService::default().plan(&request()).unwrap();
        let cost = report.cost.unwrap();
        let growth = report.growth.unwrap();

        assert!(cost.monthly_total > 0.0);
        assert_eq!(growth.points.len(), 3);
        assert_eq!(growth.baseline.monthly_cost, Some(cost.monthly_total));
    }

    #[test]
    fn test_plan_without_pricing_skips_cost_projection() {
        let mut request = request();
        request.pricing = None;
        let report = PlannerService::default().plan(&request).unwrap();
        assert!(report.cost.is_none());
        assert!(report.growth.unwrap().points.iter().all(|p| p.monthly_cost.is_none()));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let mut request = request();
        request.sizing.policy.prod_overcommit.cpu = 25.0;
        let err = PlannerService::default().plan(&request).unwrap_err();
        assert!(matches!(err, SizingError::Validation(_)));
    }

    #[test]
    fn test_missing_rate_card_aborts_plan() {
        let service = PlannerService::new(CalculatorSettings::default(), PricingCatalog::empty());
        let err = service.plan(&request()).unwrap_err();
        assert!(matches!(
            err,
            SizingError::Configuration(ConfigurationError::MissingPricingTable(_))
        ));
    }

    #[test]
    fn test_report_serializes_without_absent_stages() {
        let mut request = request();
        request.pricing = None;
        request.growth = None;
        let report = PlannerService::default().plan(&request).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("cost").is_none());
        assert!(json.get("sizing").is_some());
    }
}
