//! Growth Projector
//!
//! Scales a sizing baseline year by year, flags projected values that
//! approach cluster limits and derives scaling recommendations from those
//! warnings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumIter, EnumString};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::cost::{CostEstimate, round_cents};
use crate::error::SizingResult;
use crate::sizing::SizingOutcome;

/// Control-plane nodes a new cluster adds
const NEW_CLUSTER_NODES: f64 = 3.0;
/// Premium for moving to the next node size
const NODE_UPGRADE_PREMIUM: f64 = 0.10;
/// Savings from committing baseline capacity to reserved terms
const RESERVED_CAPACITY_SAVINGS: f64 = 0.30;
/// Storage estimate used when no cost baseline exists
const STORAGE_GB_MONTH: f64 = 0.10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GrowthPattern {
    #[default]
    Linear,
    Compound,
}

impl GrowthPattern {
    /// Multiplier over the baseline after `year` years
    pub fn factor(&self, annual_rate_percent: f64, year: u32) -> f64 {
        let rate = annual_rate_percent / 100.0;
        match self {
            GrowthPattern::Linear => 1.0 + rate * f64::from(year),
            GrowthPattern::Compound => (1.0 + rate).powi(year as i32),
        }
    }
}

/// Limits of a single cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterLimits {
    pub max_nodes: u32,
    pub max_pods: u32,
    pub cpu_capacity: Option<f64>,
    pub ram_capacity_gb: Option<f64>,
    pub storage_capacity_gb: Option<f64>,
    pub monthly_cost_threshold: Option<f64>,
}

impl Default for ClusterLimits {
    fn default() -> Self {
        Self {
            max_nodes: 5_000,
            max_pods: 150_000,
            cpu_capacity: None,
            ram_capacity_gb: None,
            storage_capacity_gb: None,
            monthly_cost_threshold: None,
        }
    }
}

/// Growth policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GrowthSettings {
    #[validate(range(min = 0.0, max = 1000.0))]
    pub annual_growth_rate: f64,
    #[validate(range(min = 1, max = 5))]
    pub projection_years: u32,
    pub pattern: GrowthPattern,
    pub include_cost_projections: bool,
    pub show_limit_warnings: bool,
    pub limits: ClusterLimits,
    #[validate(range(min = 0.0, max = 100.0))]
    pub warning_threshold_percent: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub critical_threshold_percent: f64,
}

impl Default for GrowthSettings {
    fn default() -> Self {
        Self {
            annual_growth_rate: 20.0,
            projection_years: 3,
            pattern: GrowthPattern::Linear,
            include_cost_projections: true,
            show_limit_warnings: true,
            limits: ClusterLimits::default(),
            warning_threshold_percent: 75.0,
            critical_threshold_percent: 90.0,
        }
    }
}

/// Starting point of a projection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthBaseline {
    pub apps: u32,
    pub pods: u32,
    pub nodes: u32,
    pub cpu: f64,
    pub ram_gb: f64,
    pub storage_gb: f64,
    pub monthly_cost: Option<f64>,
}

impl GrowthBaseline {
    pub fn from_results(sizing: &SizingOutcome, cost: Option<&CostEstimate>) -> Self {
        let total = &sizing.grand_total;
        Self {
            apps: total.apps,
            pods: total.pods,
            nodes: total.total_nodes,
            cpu: total.total_cpu,
            ram_gb: total.total_ram_gb,
            storage_gb: total.total_disk_gb,
            monthly_cost: cost.map(|c| c.monthly_total),
        }
    }

    fn cost_per_node(&self) -> Option<f64> {
        self.monthly_cost.map(|cost| {
            if self.nodes == 0 {
                0.0
            } else {
                cost / f64::from(self.nodes)
            }
        })
    }
}

/// Projected values for one year; year 0 is the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub year: u32,
    pub apps: u32,
    pub pods: u32,
    pub nodes: u32,
    pub cpu: f64,
    pub ram_gb: f64,
    pub storage_gb: f64,
    pub monthly_cost: Option<f64>,
    pub yearly_cost: Option<f64>,
    pub growth_from_previous: f64,
    pub cumulative_growth: f64,
}

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
pub enum LimitKind {
    Nodes,
    Pods,
    Cpu,
    Ram,
    Storage,
    Cost,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Projected value approaching a configured limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLimitWarning {
    pub kind: LimitKind,
    pub severity: Severity,
    pub year: u32,
    pub current_value: f64,
    pub projected_value: f64,
    pub limit: f64,
    pub percentage_of_limit: f64,
    pub message: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecommendationKind {
    AddWorkerNodes,
    UpgradeNodeSize,
    SplitCluster,
    AddCluster,
    ExpandStorage,
    OptimizeCost,
}

/// Suggested action; lower priority is more urgent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRecommendation {
    pub kind: RecommendationKind,
    pub priority: u8,
    pub recommended_year: u32,
    /// Monthly delta; negative values are savings
    pub estimated_cost_impact: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub years: u32,
    pub total_growth_percent: f64,
    pub apps_added: u32,
    pub nodes_added: u32,
    pub monthly_cost_increase: Option<f64>,
    pub warning_count: usize,
    pub critical_count: usize,
    /// First year with a critical warning
    pub major_scaling_year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthProjection {
    pub pattern: GrowthPattern,
    pub annual_growth_rate: f64,
    pub baseline: ProjectionPoint,
    pub points: Vec<ProjectionPoint>,
    pub summary: ProjectionSummary,
    pub warnings: Vec<ClusterLimitWarning>,
    pub recommendations: Vec<ScalingRecommendation>,
}

impl GrowthProjection {
    pub fn final_point(&self) -> &ProjectionPoint {
        self.points.last().unwrap_or(&self.baseline)
    }

    pub fn warnings_for(&self, kind: LimitKind) -> impl Iterator<Item = &ClusterLimitWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

fn round2(value: f64) -> f64 {
    round_cents(value)
}

fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        round2((current - previous) / previous * 100.0)
    }
}

/// Stateless growth projector
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthProjector;

impl GrowthProjector {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(pattern = %settings.pattern, years = settings.projection_years))]
    pub fn project(
        &self,
        baseline: &GrowthBaseline,
        settings: &GrowthSettings,
    ) -> SizingResult<GrowthProjection> {
        settings.validate()?;

        let with_cost = settings.include_cost_projections && baseline.monthly_cost.is_some();
        let point = |year: u32| -> ProjectionPoint {
            let factor = settings.pattern.factor(settings.annual_growth_rate, year);
            let previous = if year == 0 {
                factor
            } else {
                settings.pattern.factor(settings.annual_growth_rate, year - 1)
            };
            let nodes = (f64::from(baseline.nodes) * factor).round() as u32;
            let monthly_cost = if with_cost {
                baseline
                    .cost_per_node()
                    .map(|per_node| round_cents(per_node * f64::from(nodes)))
            } else {
                None
            };
            ProjectionPoint {
                year,
                apps: (f64::from(baseline.apps) * factor).round() as u32,
                pods: (f64::from(baseline.pods) * factor).round() as u32,
                nodes,
                cpu: round2(baseline.cpu * factor),
                ram_gb: round2(baseline.ram_gb * factor),
                storage_gb: round2(baseline.storage_gb * factor),
                monthly_cost,
                yearly_cost: monthly_cost.map(|m| round_cents(m * 12.0)),
                growth_from_previous: percent_change(factor, previous),
                cumulative_growth: round2((factor - 1.0) * 100.0),
            }
        };

        let origin = point(0);
        let points: Vec<ProjectionPoint> = (1..=settings.projection_years).map(point).collect();

        let warnings = if settings.show_limit_warnings {
            points
                .iter()
                .flat_map(|p| limit_warnings(&origin, p, settings))
                .collect()
        } else {
            Vec::new()
        };
        let recommendations = recommend(baseline, &points, &warnings, &settings.limits);
        let summary = summarize(&origin, &points, &warnings);

        if let Some(year) = summary.major_scaling_year {
            warn!(year, "Projected growth crosses a critical cluster limit");
        }
        info!(
            warnings = warnings.len(),
            recommendations = recommendations.len(),
            "Growth projection complete"
        );

        Ok(GrowthProjection {
            pattern: settings.pattern,
            annual_growth_rate: settings.annual_growth_rate,
            baseline: origin,
            points,
            summary,
            warnings,
            recommendations,
        })
    }
}

fn limit_warnings(
    baseline: &ProjectionPoint,
    point: &ProjectionPoint,
    settings: &GrowthSettings,
) -> Vec<ClusterLimitWarning> {
    let limits = &settings.limits;
    let critical_at = settings
        .critical_threshold_percent
        .max(settings.warning_threshold_percent);

    let checks = [
        (
            LimitKind::Nodes,
            f64::from(baseline.nodes),
            Some(f64::from(point.nodes)),
            Some(f64::from(limits.max_nodes)),
        ),
        (
            LimitKind::Pods,
            f64::from(baseline.pods),
            Some(f64::from(point.pods)),
            Some(f64::from(limits.max_pods)),
        ),
        (LimitKind::Cpu, baseline.cpu, Some(point.cpu), limits.cpu_capacity),
        (LimitKind::Ram, baseline.ram_gb, Some(point.ram_gb), limits.ram_capacity_gb),
        (
            LimitKind::Storage,
            baseline.storage_gb,
            Some(point.storage_gb),
            limits.storage_capacity_gb,
        ),
        (
            LimitKind::Cost,
            baseline.monthly_cost.unwrap_or(0.0),
            point.monthly_cost,
            limits.monthly_cost_threshold,
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(kind, current, projected, limit)| {
            let (projected, limit) = (projected?, limit.filter(|l| *l > 0.0)?);
            let percentage = projected / limit * 100.0;
            let severity = if percentage >= critical_at {
                Severity::Critical
            } else if percentage >= settings.warning_threshold_percent {
                Severity::Warning
            } else {
                return None;
            };
            Some(ClusterLimitWarning {
                kind,
                severity,
                year: point.year,
                current_value: current,
                projected_value: projected,
                limit,
                percentage_of_limit: round2(percentage),
                message: format!(
                    "Year {}: projected {kind} {projected} is {:.1}% of limit {limit}",
                    point.year, percentage
                ),
            })
        })
        .collect()
}

fn priority(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 1,
        Severity::Warning => 2,
    }
}

fn recommend(
    baseline: &GrowthBaseline,
    points: &[ProjectionPoint],
    warnings: &[ClusterLimitWarning],
    limits: &ClusterLimits,
) -> Vec<ScalingRecommendation> {
    let per_node = baseline.cost_per_node().unwrap_or(0.0);
    let point_for = |year: u32| points.iter().find(|p| p.year == year);
    let monthly_at = |year: u32| point_for(year).and_then(|p| p.monthly_cost).unwrap_or(0.0);
    let mut recommendations = Vec::new();

    if let Some(w) = warnings
        .iter()
        .find(|w| matches!(w.kind, LimitKind::Nodes | LimitKind::Pods))
    {
        let added = point_for(w.year)
            .map(|p| f64::from(p.nodes.saturating_sub(baseline.nodes)))
            .unwrap_or(0.0);
        recommendations.push(ScalingRecommendation {
            kind: RecommendationKind::AddWorkerNodes,
            priority: priority(w.severity),
            recommended_year: w.year,
            estimated_cost_impact: round_cents(added * per_node),
            description: format!("Add {added} worker nodes by year {} to absorb growth", w.year),
        });
    }

    let compute_years: BTreeSet<u32> = warnings
        .iter()
        .filter(|w| matches!(w.kind, LimitKind::Cpu | LimitKind::Ram))
        .map(|w| w.year)
        .collect();
    if compute_years.len() >= 2 {
        if let Some(&year) = compute_years.first() {
            recommendations.push(ScalingRecommendation {
                kind: RecommendationKind::UpgradeNodeSize,
                priority: 2,
                recommended_year: year,
                estimated_cost_impact: round_cents(monthly_at(year) * NODE_UPGRADE_PREMIUM),
                description: format!(
                    "CPU or memory pressure persists for {} years; move to larger nodes",
                    compute_years.len()
                ),
            });
        }
    }

    if let Some(w) = warnings
        .iter()
        .find(|w| w.kind == LimitKind::Nodes && w.severity == Severity::Critical)
    {
        let max_nodes = f64::from(limits.max_nodes);
        if w.projected_value < 2.0 * max_nodes {
            recommendations.push(ScalingRecommendation {
                kind: RecommendationKind::SplitCluster,
                priority: 1,
                recommended_year: w.year,
                estimated_cost_impact: round_cents(NEW_CLUSTER_NODES * per_node),
                description: format!(
                    "Split workloads across two clusters before year {}",
                    w.year
                ),
            });
        } else {
            let overflow = w.projected_value - max_nodes;
            recommendations.push(ScalingRecommendation {
                kind: RecommendationKind::AddCluster,
                priority: 1,
                recommended_year: w.year,
                estimated_cost_impact: round_cents((overflow + NEW_CLUSTER_NODES) * per_node),
                description: format!(
                    "Projected {} nodes exceed a single cluster; add clusters by year {}",
                    w.projected_value, w.year
                ),
            });
        }
    }

    if let Some(w) = warnings.iter().find(|w| w.kind == LimitKind::Storage) {
        let added_gb = (w.projected_value - w.current_value).max(0.0);
        recommendations.push(ScalingRecommendation {
            kind: RecommendationKind::ExpandStorage,
            priority: priority(w.severity),
            recommended_year: w.year,
            estimated_cost_impact: round_cents(added_gb * STORAGE_GB_MONTH),
            description: format!("Expand storage capacity by {added_gb:.0} GB by year {}", w.year),
        });
    }

    if let Some(w) = warnings.iter().find(|w| w.kind == LimitKind::Cost) {
        recommendations.push(ScalingRecommendation {
            kind: RecommendationKind::OptimizeCost,
            priority: 3,
            recommended_year: w.year,
            estimated_cost_impact: -round_cents(w.projected_value * RESERVED_CAPACITY_SAVINGS),
            description: "Commit steady-state capacity to reserved pricing".to_string(),
        });
    }

    recommendations.sort_by_key(|r| (r.priority, r.recommended_year));
    recommendations
}

fn summarize(
    baseline: &ProjectionPoint,
    points: &[ProjectionPoint],
    warnings: &[ClusterLimitWarning],
) -> ProjectionSummary {
    let last = points.last().unwrap_or(baseline);
    ProjectionSummary {
        years: last.year,
        total_growth_percent: last.cumulative_growth,
        apps_added: last.apps.saturating_sub(baseline.apps),
        nodes_added: last.nodes.saturating_sub(baseline.nodes),
        monthly_cost_increase: last
            .monthly_cost
            .zip(baseline.monthly_cost)
            .map(|(end, start)| round_cents(end - start)),
        warning_count: warnings.iter().filter(|w| w.severity == Severity::Warning).count(),
        critical_count: warnings.iter().filter(|w| w.severity == Severity::Critical).count(),
        major_scaling_year: warnings
            .iter()
            .filter(|w| w.severity == Severity::Critical)
            .map(|w| w.year)
            .min(),
    }
}
