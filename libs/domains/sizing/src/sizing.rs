//! Sizing Calculator
//!
//! Converts application counts and sizing policy into per-environment
//! node counts and resource totals.
//!
//! ```text
//! apps ──► pods ──► demand (headroom, overcommit) ──► workers
//!                                                   ├─► infra
//!                                                   ├─► masters / etcd
//!                                                   └─► DR standby
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, instrument};
use validator::Validate;

use crate::environment::{
    AppCounts, AppTierCounts, EnvironmentKind, NodeRole, SizeTier, with_fallback,
};
use crate::error::{ConfigurationError, SizingError, SizingResult};
use crate::ha_dr::{ControlPlaneHa, HaDrConfig};
use crate::policy::{CalculatorSettings, PolicySettings};
use crate::resource_specs::{
    DistributionKind, DistributionProfile, NodeSpec, NodeSpecTable, ServerRole, Technology,
};
use crate::tiered::TierTable;

/// Kind of platform being sized
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
pub enum ClusterMode {
    /// Container-orchestration cluster per environment
    #[default]
    Kubernetes,
    /// Fleet of dedicated virtual machines
    VirtualMachines,
}

/// Class of node a group belongs to
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
pub enum NodeClass {
    Master,
    Etcd,
    Infra,
    Worker,
}

/// Identical nodes within one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub class: NodeClass,
    pub label: String,
    pub count: u32,
    pub spec: NodeSpec,
}

impl NodeGroup {
    fn new(class: NodeClass, label: impl Into<String>, count: u32, spec: NodeSpec) -> Self {
        Self {
            class,
            label: label.into(),
            count,
            spec,
        }
    }

    pub fn total(&self) -> NodeSpec {
        self.spec * self.count
    }
}

/// Validated sizing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SizingInput {
    #[serde(default)]
    pub technology: Technology,
    #[serde(default)]
    pub distribution: DistributionKind,
    /// Replaces the built-in profile of `distribution` when present
    #[serde(default)]
    pub distribution_profile: Option<DistributionProfile>,
    #[serde(default)]
    pub cluster_mode: ClusterMode,
    #[serde(default)]
    pub apps: AppCounts,
    pub enabled_environments: BTreeSet<EnvironmentKind>,
    #[serde(default)]
    #[validate(nested)]
    pub policy: PolicySettings,
    /// Per-environment node specs layered over the distribution profile
    #[serde(default)]
    pub custom_node_specs: NodeSpecTable,
    #[serde(default)]
    pub ha_dr: HaDrConfig,
    #[serde(default)]
    pub ha_dr_overrides: BTreeMap<EnvironmentKind, HaDrConfig>,
}

impl SizingInput {
    /// Input for a single production environment with default policy
    pub fn production_only(distribution: DistributionKind, apps: AppTierCounts) -> Self {
        Self {
            technology: Technology::default(),
            distribution,
            distribution_profile: None,
            cluster_mode: ClusterMode::Kubernetes,
            apps: AppCounts {
                production: Some(apps),
                ..Default::default()
            },
            enabled_environments: BTreeSet::from([EnvironmentKind::Prod]),
            policy: PolicySettings::default(),
            custom_node_specs: NodeSpecTable::new(),
            ha_dr: HaDrConfig::default(),
            ha_dr_overrides: BTreeMap::new(),
        }
    }

    /// Distribution profile with custom node specs applied
    pub fn profile(&self) -> DistributionProfile {
        let base = self
            .distribution_profile
            .clone()
            .unwrap_or_else(|| self.distribution.profile());
        if self.custom_node_specs.is_empty() {
            base
        } else {
            base.with_overrides(&self.custom_node_specs)
        }
    }

    /// HA/DR override, else the global config
    ///
    /// Only Prod inherits the DR pattern; the DR environment is the standby
    /// site and non-production has none.
    pub fn ha_dr_for(&self, environment: EnvironmentKind) -> HaDrConfig {
        let production = if environment == EnvironmentKind::DR {
            self.ha_dr.without_dr_site()
        } else {
            self.ha_dr.clone()
        };
        with_fallback(
            environment,
            self.ha_dr_overrides.get(&environment).cloned(),
            Some(production),
            Some(self.ha_dr.without_dr_site()),
        )
        .unwrap_or_default()
    }
}

/// Node and resource breakdown for one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentResult {
    pub environment: EnvironmentKind,
    pub apps: u32,
    /// Effective replicas per app after the HA pattern is applied
    pub replicas: u32,
    pub pods: u32,
    /// Self-managed control-plane nodes
    pub masters: u32,
    /// Provider-operated control-plane nodes, informational only
    pub managed_masters: u32,
    pub infra: u32,
    pub workers: u32,
    pub etcd: u32,
    /// Running nodes at the DR site, informational only
    pub dr_nodes: u32,
    pub az_count: u32,
    pub dr_cost_multiplier: f64,
    pub ha_dr: HaDrConfig,
    pub node_groups: Vec<NodeGroup>,
    pub total_nodes: u32,
    pub total_cpu: f64,
    pub total_ram_gb: f64,
    pub total_disk_gb: f64,
}

impl EnvironmentResult {
    /// Summed resources of one node class
    pub fn class_total(&self, class: NodeClass) -> NodeSpec {
        self.node_groups
            .iter()
            .filter(|g| g.class == class)
            .fold(NodeSpec::ZERO, |acc, g| acc + g.total())
    }
}

/// Sum of all enabled environments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrandTotal {
    pub apps: u32,
    pub pods: u32,
    pub masters: u32,
    pub infra: u32,
    pub workers: u32,
    pub etcd: u32,
    pub dr_nodes: u32,
    pub total_nodes: u32,
    pub total_cpu: f64,
    pub total_ram_gb: f64,
    pub total_disk_gb: f64,
}

impl GrandTotal {
    pub fn from_environments(environments: &[EnvironmentResult]) -> Self {
        environments.iter().fold(Self::default(), |acc, env| Self {
            apps: acc.apps.saturating_add(env.apps),
            pods: acc.pods.saturating_add(env.pods),
            masters: acc.masters.saturating_add(env.masters),
            infra: acc.infra.saturating_add(env.infra),
            workers: acc.workers.saturating_add(env.workers),
            etcd: acc.etcd.saturating_add(env.etcd),
            dr_nodes: acc.dr_nodes.saturating_add(env.dr_nodes),
            total_nodes: acc.total_nodes.saturating_add(env.total_nodes),
            total_cpu: acc.total_cpu + env.total_cpu,
            total_ram_gb: acc.total_ram_gb + env.total_ram_gb,
            total_disk_gb: acc.total_disk_gb + env.total_disk_gb,
        })
    }
}

/// Output of one sizing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingOutcome {
    pub distribution: String,
    pub cluster_mode: ClusterMode,
    pub managed_control_plane: bool,
    pub environments: Vec<EnvironmentResult>,
    pub grand_total: GrandTotal,
}

impl SizingOutcome {
    pub fn environment(&self, environment: EnvironmentKind) -> Option<&EnvironmentResult> {
        self.environments.iter().find(|e| e.environment == environment)
    }
}

/// Node counts for a workload before totals are assembled
struct NodeCounts {
    masters: u32,
    managed_masters: u32,
    infra: u32,
    workers: u32,
    etcd: u32,
    groups: Vec<NodeGroup>,
}

/// Stateless sizing calculator
#[derive(Debug, Clone, Default)]
pub struct SizingCalculator {
    settings: CalculatorSettings,
}

impl SizingCalculator {
    pub fn new(settings: CalculatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CalculatorSettings {
        &self.settings
    }

    /// Size every enabled environment
    #[instrument(skip_all, fields(distribution = %input.distribution, mode = %input.cluster_mode))]
    pub fn compute(&self, input: &SizingInput) -> SizingResult<SizingOutcome> {
        if !input.enabled_environments.contains(&EnvironmentKind::Prod) {
            return Err(ConfigurationError::ProductionDisabled.into());
        }

        let profile = input.profile();
        let environments = input
            .enabled_environments
            .iter()
            .map(|env| self.size_environment(input, &profile, *env))
            .collect::<SizingResult<Vec<_>>>()?;
        let grand_total = GrandTotal::from_environments(&environments);

        debug!(
            total_nodes = grand_total.total_nodes,
            total_cpu = grand_total.total_cpu,
            "Sizing complete"
        );

        Ok(SizingOutcome {
            distribution: profile.name.clone(),
            cluster_mode: input.cluster_mode,
            // a VM fleet has no cluster control plane to bill
            managed_control_plane: profile.has_managed_control_plane
                && input.cluster_mode == ClusterMode::Kubernetes,
            environments,
            grand_total,
        })
    }

    fn size_environment(
        &self,
        input: &SizingInput,
        profile: &DistributionProfile,
        environment: EnvironmentKind,
    ) -> SizingResult<EnvironmentResult> {
        let apps = input.apps.resolve(environment);
        let policy = &input.policy;
        let replicas = policy
            .ha_pattern
            .effective_replicas(policy.replicas_for(environment, self.settings.replica_bounds()));
        let pods = scaled(environment, apps.total(), replicas)?;
        let ha_dr = input.ha_dr_for(environment);

        let counts = match input.cluster_mode {
            ClusterMode::Kubernetes => {
                self.size_cluster(input, profile, environment, &apps, replicas, &ha_dr)?
            }
            ClusterMode::VirtualMachines => {
                self.size_vm_fleet(policy, environment, &apps, replicas)?
            }
        };

        let totals = counts
            .groups
            .iter()
            .fold(NodeSpec::ZERO, |acc, group| acc + group.total());
        let total_nodes = [counts.infra, counts.workers, counts.etcd]
            .into_iter()
            .try_fold(counts.masters, |acc, n| checked_add(environment, acc, n))?;

        let result = EnvironmentResult {
            environment,
            apps: apps.total(),
            replicas,
            pods,
            masters: counts.masters,
            managed_masters: counts.managed_masters,
            infra: counts.infra,
            workers: counts.workers,
            etcd: counts.etcd,
            dr_nodes: ha_dr.dr_pattern.standby_nodes(counts.workers),
            az_count: ha_dr.effective_az_count(),
            dr_cost_multiplier: ha_dr.cost_multiplier(),
            ha_dr,
            node_groups: counts.groups,
            total_nodes,
            total_cpu: totals.cpu,
            total_ram_gb: totals.ram_gb,
            total_disk_gb: totals.disk_gb,
        };

        debug!(
            environment = %environment,
            apps = result.apps,
            pods = result.pods,
            workers = result.workers,
            infra = result.infra,
            masters = result.masters,
            "Sized environment"
        );

        Ok(result)
    }

    fn size_cluster(
        &self,
        input: &SizingInput,
        profile: &DistributionProfile,
        environment: EnvironmentKind,
        apps: &AppTierCounts,
        replicas: u32,
        ha_dr: &HaDrConfig,
    ) -> SizingResult<NodeCounts> {
        let managed = profile.has_managed_control_plane
            || ha_dr.control_plane_ha == ControlPlaneHa::Managed;
        let worker_spec = profile.node_spec(environment, NodeRole::Worker)?;
        let workers = self.worker_count(
            input,
            environment,
            apps,
            replicas,
            &worker_spec,
            managed,
            ha_dr.effective_az_count(),
        )?;

        let control_plane_nodes = match ha_dr.control_plane_ha {
            ControlPlaneHa::Single => 1,
            _ if workers > self.settings.large_cluster_worker_threshold => {
                ha_dr.control_plane_nodes.max(5)
            }
            _ => ha_dr.control_plane_nodes.max(1),
        };
        let (masters, managed_masters) = if managed {
            (0, control_plane_nodes)
        } else {
            (control_plane_nodes, 0)
        };
        let etcd = match ha_dr.control_plane_ha {
            ControlPlaneHa::ExternalEtcd if !managed && masters >= 5 => 5,
            ControlPlaneHa::ExternalEtcd if !managed => 3,
            _ => 0,
        };

        let infra = if profile.has_infra_nodes {
            let (min, max) = self.settings.infra_bounds(environment, apps.total());
            apps.total()
                .div_ceil(self.settings.apps_per_infra_node.max(1))
                .clamp(min, max)
        } else {
            0
        };

        let mut groups = Vec::new();
        if masters > 0 || etcd > 0 {
            let cp_spec = profile.node_spec(environment, NodeRole::ControlPlane)?;
            if masters > 0 {
                groups.push(NodeGroup::new(NodeClass::Master, "control-plane", masters, cp_spec));
            }
            if etcd > 0 {
                groups.push(NodeGroup::new(NodeClass::Etcd, "etcd", etcd, cp_spec));
            }
        }
        if infra > 0 {
            let infra_spec = profile.node_spec(environment, NodeRole::Infra)?;
            groups.push(NodeGroup::new(NodeClass::Infra, "infra", infra, infra_spec));
        }
        groups.push(NodeGroup::new(NodeClass::Worker, "worker", workers, worker_spec));

        Ok(NodeCounts {
            masters,
            managed_masters,
            infra,
            workers,
            etcd,
            groups,
        })
    }

    /// Workers needed for the pod demand of one environment
    fn worker_count(
        &self,
        input: &SizingInput,
        environment: EnvironmentKind,
        apps: &AppTierCounts,
        replicas: u32,
        worker_spec: &NodeSpec,
        managed: bool,
        az_count: u32,
    ) -> SizingResult<u32> {
        let policy = &input.policy;
        let headroom = 1.0 + policy.headroom_for(environment) / 100.0;
        let overcommit = policy.overcommit_for(environment);
        let demand = apps.tiers().try_fold(NodeSpec::ZERO, |acc, (tier, count)| {
            scaled(environment, count, replicas)
                .map(|pods| acc + input.technology.pod_spec(tier) * pods)
        })?;

        let computed = if demand.is_zero() {
            0
        } else {
            let allocatable = policy.allocatable_fraction();
            let cpu_capacity = worker_spec.cpu * allocatable;
            let ram_capacity = worker_spec.ram_gb * allocatable;
            if cpu_capacity <= 0.0 || ram_capacity <= 0.0 {
                return Err(SizingError::policy(
                    environment,
                    "worker nodes have no allocatable capacity",
                ));
            }
            let by_cpu = ceil_units(
                environment,
                demand.cpu * headroom / overcommit.cpu / cpu_capacity,
            )?;
            let by_ram = ceil_units(
                environment,
                demand.ram_gb * headroom / overcommit.ram / ram_capacity,
            )?;
            by_cpu.max(by_ram)
        };

        let floor = if managed {
            self.settings.managed_min_worker_nodes
        } else {
            self.settings.min_worker_nodes
        };
        computed
            .max(floor)
            .checked_next_multiple_of(az_count.max(1))
            .and_then(|spread| spread.checked_add(policy.ha_pattern.spare_workers()))
            .ok_or_else(|| SizingError::policy(environment, "worker count overflows"))
    }

    fn size_vm_fleet(
        &self,
        policy: &PolicySettings,
        environment: EnvironmentKind,
        apps: &AppTierCounts,
        replicas: u32,
    ) -> SizingResult<NodeCounts> {
        let headroom = 1.0 + policy.headroom_for(environment) / 100.0;
        let mut groups = Vec::new();

        let mut workers = 0;
        for (tier, count) in apps.tiers() {
            let servers = ceil_units(
                environment,
                f64::from(scaled(environment, count, replicas)?) * headroom,
            )?;
            workers = checked_add(environment, workers, servers)?;
            groups.push(NodeGroup::new(
                NodeClass::Worker,
                format!("application-{tier}"),
                servers,
                ServerRole::Application.vm_spec(tier),
            ));
        }

        let mut infra = 0;
        let total_apps = apps.total();
        if total_apps > 0 {
            let pairing = if environment.is_production_like() { 2 } else { 1 };
            let databases = scaled(
                environment,
                total_apps.div_ceil(self.settings.apps_per_database_server.max(1)),
                pairing,
            )?;
            let db_tier = database_tiers()
                .resolve(f64::from(total_apps))
                .copied()
                .unwrap_or(SizeTier::XLarge);
            groups.push(NodeGroup::new(
                NodeClass::Infra,
                "database",
                databases,
                ServerRole::Database.vm_spec(db_tier),
            ));

            let load_balancers = pairing;
            groups.push(NodeGroup::new(
                NodeClass::Infra,
                "load-balancer",
                load_balancers,
                ServerRole::LoadBalancer.vm_spec(SizeTier::Small),
            ));
            infra = checked_add(environment, databases, load_balancers)?;
        }

        Ok(NodeCounts {
            masters: 0,
            managed_masters: 0,
            infra,
            workers,
            etcd: 0,
            groups,
        })
    }
}

/// Database server size by number of applications served
fn database_tiers() -> TierTable<SizeTier> {
    TierTable::from_pairs([
        (Some(10.0), SizeTier::Small),
        (Some(25.0), SizeTier::Medium),
        (Some(50.0), SizeTier::Large),
        (None, SizeTier::XLarge),
    ])
}

/// Ceiling to whole units, tolerating float noise just above an integer
fn ceil_units(environment: EnvironmentKind, value: f64) -> SizingResult<u32> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(SizingError::policy(
            environment,
            format!("computed node demand is invalid: {value}"),
        ));
    }
    Ok((value - 1e-9).ceil().max(0.0) as u32)
}

fn checked_add(environment: EnvironmentKind, a: u32, b: u32) -> SizingResult<u32> {
    a.checked_add(b).ok_or_else(|| SizingError::policy(environment, "node count overflows"))
}

/// `count × replicas`, rejecting results that do not fit a node count
fn scaled(environment: EnvironmentKind, count: u32, replicas: u32) -> SizingResult<u32> {
    count.checked_mul(replicas).ok_or_else(|| {
        SizingError::policy(
            environment,
            format!("{count} apps x {replicas} replicas overflows the pod count"),
        )
    })
}
