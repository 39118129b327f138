//! End-to-end sizing, pricing and projection scenarios through the public API.

use std::collections::BTreeSet;

use domain_sizing::cost::{
    CapacityPricing, CloudPricing, CloudProvider, CostCategory, Discount, DiscountKind,
    DiscountScope, LicensedPlatformPricing, OnPremCostBasis, PricingContext, ScopeSubtotals,
    UserPricing, discount_amount,
};
use domain_sizing::ha_dr::{ControlPlaneHa, DrPattern, HaDrConfig, NodeDistribution};
use domain_sizing::sizing::NodeClass;
use domain_sizing::{
    AppTierCounts, CalculatorSettings, DistributionKind, EnvironmentKind, GrowthPattern,
    GrowthSettings, NodeRole, NodeSpec, PlanRequest, PlannerService, SizingError, SizingInput,
    TierTable, multiplier, resolve_pack_count,
};

fn prod_only(distribution: DistributionKind, apps: AppTierCounts) -> SizingInput {
    SizingInput::production_only(distribution, apps)
}

#[test]
fn test_generic_kubernetes_scenario() {
    let mut input = prod_only(DistributionKind::Kubernetes, AppTierCounts::new(10, 5, 0, 0));
    input.policy.replicas.insert(EnvironmentKind::Prod, 3);
    input.policy.headroom_percent.insert(EnvironmentKind::Prod, 0.0);
    input
        .custom_node_specs
        .set_spec(EnvironmentKind::Prod, NodeRole::Worker, NodeSpec::new(16.0, 64.0, 200.0));

    let outcome = PlannerService::default().size(&input).unwrap();
    let prod = outcome.environment(EnvironmentKind::Prod).unwrap();

    assert_eq!(prod.pods, 45);
    assert!(prod.workers >= 3);
    assert_eq!(prod.infra, 0);
    assert_eq!(prod.etcd, 0);
    assert_eq!(prod.total_nodes, prod.masters + prod.infra + prod.workers + prod.etcd);

    let masters_cpu = prod.class_total(NodeClass::Master).cpu;
    let workers_cpu = prod.class_total(NodeClass::Worker).cpu;
    assert_eq!(prod.total_cpu, masters_cpu + workers_cpu);
    assert_eq!(workers_cpu, f64::from(prod.workers) * 16.0);
}

#[test]
fn test_openshift_large_deployment_infra_floor() {
    let input = prod_only(DistributionKind::OpenShift, AppTierCounts::new(60, 0, 0, 0));
    let outcome = PlannerService::default().size(&input).unwrap();
    let prod = outcome.environment(EnvironmentKind::Prod).unwrap();
    assert!(prod.infra >= 5, "infra = {}", prod.infra);
}

#[test]
fn test_ha_dr_multiplier_scenario() {
    let config = HaDrConfig {
        control_plane_ha: ControlPlaneHa::StackedHa,
        control_plane_nodes: 5,
        node_distribution: NodeDistribution::MultiAz,
        dr_pattern: DrPattern::WarmStandby,
        ..Default::default()
    };
    assert!((multiplier(&config, None) - 1.83).abs() < 1e-9);
}

#[test]
fn test_pack_allocation_examples() {
    assert_eq!(resolve_pack_count(0, 150), 1);
    assert_eq!(resolve_pack_count(150, 150), 1);
    assert_eq!(resolve_pack_count(151, 150), 2);
    assert_eq!(resolve_pack_count(1000, 150), 7);
}

#[test]
fn test_fixed_license_discount_capped() {
    let subtotals = ScopeSubtotals {
        license: 1_250.0,
        add_ons: 300.0,
        services: 0.0,
    };
    let discount = Discount {
        kind: DiscountKind::Fixed(10_000.0),
        scope: DiscountScope::LicenseOnly,
    };
    assert_eq!(discount_amount(&discount, &subtotals), 1_250.0);
}

#[test]
fn test_production_must_be_enabled() {
    let mut input = prod_only(DistributionKind::Kubernetes, AppTierCounts::new(1, 0, 0, 0));
    input.enabled_environments = BTreeSet::from([EnvironmentKind::Dev]);
    let err = PlannerService::default().size(&input).unwrap_err();
    assert!(matches!(err, SizingError::Configuration(_)));
}

#[test]
fn test_environment_without_apps_is_zero_not_error() {
    let mut input = prod_only(DistributionKind::Kubernetes, AppTierCounts::new(4, 0, 0, 0));
    input.enabled_environments = BTreeSet::from([EnvironmentKind::Test, EnvironmentKind::Prod]);
    let outcome = PlannerService::default().size(&input).unwrap();
    let test = outcome.environment(EnvironmentKind::Test).unwrap();
    assert_eq!(test.apps, 0);
    assert_eq!(test.pods, 0);
}

#[test]
fn test_multi_environment_cloud_plan() {
    let mut sizing = prod_only(DistributionKind::Eks, AppTierCounts::new(20, 10, 4, 0));
    sizing.apps.non_production = Some(AppTierCounts::new(10, 4, 0, 0));
    sizing.enabled_environments = BTreeSet::from([
        EnvironmentKind::Dev,
        EnvironmentKind::Stage,
        EnvironmentKind::Prod,
        EnvironmentKind::DR,
    ]);
    sizing.ha_dr = HaDrConfig {
        node_distribution: NodeDistribution::MultiAz,
        az_count: 3,
        dr_pattern: DrPattern::WarmStandby,
        ..Default::default()
    };

    let request = PlanRequest {
        sizing,
        pricing: Some(PricingContext::Cloud(CloudPricing {
            provider: CloudProvider::Aws,
            region: Some("eu-west-1".to_string()),
            egress_gb_per_month: 2_000.0,
            support_percent: 10.0,
            ..Default::default()
        })),
        weighting: Default::default(),
        growth: Some(GrowthSettings {
            annual_growth_rate: 25.0,
            projection_years: 5,
            pattern: GrowthPattern::Compound,
            ..Default::default()
        }),
    };

    let report = PlannerService::default().plan(&request).unwrap();
    assert_eq!(report.sizing.environments.len(), 4);
    assert_eq!(
        report.sizing.grand_total.total_nodes,
        report.sizing.environments.iter().map(|e| e.total_nodes).sum::<u32>()
    );

    let cost = report.cost.unwrap();
    assert_eq!(cost.provider, "aws");
    assert_eq!(cost.region, "eu-west-1");
    let pct: f64 = cost.categories.iter().map(|c| c.percentage).sum();
    assert!((pct - 100.0).abs() <= 0.1);
    let env_pct: f64 = cost.environments.iter().map(|e| e.percentage).sum();
    assert!((env_pct - 100.0).abs() <= 0.1);
    assert!(cost.category(CostCategory::Support).unwrap().monthly > 0.0);

    // DR workers are informational and never part of node totals
    let prod = report.sizing.environment(EnvironmentKind::Prod).unwrap();
    assert!(prod.dr_nodes > 0);
    let dev = report.sizing.environment(EnvironmentKind::Dev).unwrap();
    assert_eq!(dev.dr_nodes, 0);
    // the DR site is not costed as having its own standby
    let dr = report.sizing.environment(EnvironmentKind::DR).unwrap();
    assert_eq!(dr.dr_nodes, 0);
    assert!(dr.dr_cost_multiplier < prod.dr_cost_multiplier);

    let growth = report.growth.unwrap();
    assert_eq!(growth.points.len(), 5);
    let last = growth.final_point();
    assert!((last.cumulative_growth - (1.25f64.powi(5) - 1.0) * 100.0).abs() < 0.01);
}

#[test]
fn test_licensed_platform_plan() {
    let request = PlanRequest {
        sizing: prod_only(DistributionKind::Kubernetes, AppTierCounts::new(30, 0, 0, 0)),
        pricing: Some(PricingContext::Licensed(LicensedPlatformPricing {
            edition_base_monthly: 3_000.0,
            capacity: CapacityPricing {
                pack_size: 150,
                price_per_pack_monthly: 800.0,
                units_per_app: 10,
                required_units: None,
            },
            users: UserPricing {
                users: 40_000,
                tiers: TierTable::from_pairs([(Some(1_000.0), 500.0), (Some(10_000.0), 2_500.0)]),
            },
            discount: Some(Discount {
                kind: DiscountKind::Percentage(10.0),
                scope: DiscountScope::Total,
            }),
            ..Default::default()
        })),
        weighting: Default::default(),
        growth: None,
    };

    let report = PlannerService::default().plan(&request).unwrap();
    let cost = report.cost.unwrap();
    // 300 units -> 2 packs; 40k users resolve to the top tier
    // 3000 + 2 x 800 + 2500 = 7100, less 10%
    assert_eq!(cost.monthly_total, 6_390.0);
    assert_eq!(cost.category(CostCategory::Compute).unwrap().monthly, 0.0);
}

#[test]
fn test_on_prem_zero_cost_tco() {
    let request = PlanRequest {
        sizing: prod_only(DistributionKind::Rke2, AppTierCounts::new(5, 0, 0, 0)),
        pricing: Some(PricingContext::OnPrem(OnPremCostBasis {
            hardware_cost_per_node: 0.0,
            facilities_per_node_month: 0.0,
            storage_per_gb_month: 0.0,
            network_per_node_month: 0.0,
            engineers: 0.0,
            ..Default::default()
        })),
        weighting: Default::default(),
        growth: None,
    };
    let cost = PlannerService::default().plan(&request).unwrap().cost.unwrap();
    assert_eq!(cost.monthly_total, 0.0);
    assert_eq!(cost.yearly_total(), 0.0);
    assert_eq!(cost.five_year_tco(), 0.0);
    assert!(cost.categories.iter().all(|c| c.percentage == 0.0));
}

#[test]
fn test_custom_settings_raise_worker_floor() {
    let settings = CalculatorSettings {
        min_worker_nodes: 6,
        ..Default::default()
    };
    let service = PlannerService::new(settings, Default::default());
    let input = prod_only(DistributionKind::Kubernetes, AppTierCounts::new(1, 0, 0, 0));
    let outcome = service.size(&input).unwrap();
    assert_eq!(outcome.grand_total.workers, 6);
}

#[test]
fn test_plan_request_from_json() {
    let json = r#"{
        "sizing": {
            "distribution": "openshift",
            "apps": { "production": { "small": 12, "medium": 3 } },
            "enabled_environments": ["prod", "dr"],
            "ha_dr": { "dr_pattern": "hot_standby" }
        },
        "pricing": { "kind": "cloud", "provider": "azure" },
        "growth": { "annual_growth_rate": 15.0, "projection_years": 2 }
    }"#;
    let request: PlanRequest = serde_json::from_str(json).unwrap();
    let report = PlannerService::default().plan(&request).unwrap();

    assert_eq!(report.sizing.environments.len(), 2);
    assert_eq!(report.cost.unwrap().provider, "azure");
    assert_eq!(report.growth.unwrap().points.len(), 2);
}
