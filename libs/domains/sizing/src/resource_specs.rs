//! Resource Spec Tables
//!
//! Static lookups of CPU/RAM/disk per workload tier, per VM server role and
//! per platform distribution, with per-environment overrides stored as a
//! single `{environment, role, metric}` table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, Mul};
use strum::{Display, EnumIter, EnumString};

use crate::environment::{EnvironmentKind, NodeRole, SizeTier, with_fallback};
use crate::error::ConfigurationError;

/// CPU cores, RAM and disk of a single node or pod
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub cpu: f64,
    pub ram_gb: f64,
    pub disk_gb: f64,
}

impl NodeSpec {
    /// Explicit "no capacity" spec, e.g. for platforms without infra nodes
    pub const ZERO: NodeSpec = NodeSpec::new(0.0, 0.0, 0.0);

    pub const fn new(cpu: f64, ram_gb: f64, disk_gb: f64) -> Self {
        Self {
            cpu,
            ram_gb,
            disk_gb,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.cpu == 0.0 && self.ram_gb == 0.0 && self.disk_gb == 0.0
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpu => self.cpu,
            Metric::RamGb => self.ram_gb,
            Metric::DiskGb => self.disk_gb,
        }
    }
}

impl Add for NodeSpec {
    type Output = NodeSpec;

    fn add(self, rhs: NodeSpec) -> NodeSpec {
        NodeSpec::new(
            self.cpu + rhs.cpu,
            self.ram_gb + rhs.ram_gb,
            self.disk_gb + rhs.disk_gb,
        )
    }
}

impl Mul<u32> for NodeSpec {
    type Output = NodeSpec;

    fn mul(self, count: u32) -> NodeSpec {
        let count = f64::from(count);
        NodeSpec::new(self.cpu * count, self.ram_gb * count, self.disk_gb * count)
    }
}

/// Resource dimension of a node spec
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
pub enum Metric {
    Cpu,
    RamGb,
    DiskGb,
}

/// One cell of a [`NodeSpecTable`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecEntry {
    pub environment: EnvironmentKind,
    pub role: NodeRole,
    pub metric: Metric,
    pub value: f64,
}

/// `{environment, role, metric} -> value` table.
///
/// A role has a spec in an environment only when all three metrics are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SpecEntry>", into = "Vec<SpecEntry>")]
pub struct NodeSpecTable {
    values: BTreeMap<(EnvironmentKind, NodeRole, Metric), f64>,
}

impl NodeSpecTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, environment: EnvironmentKind, role: NodeRole, metric: Metric) -> Option<f64> {
        self.values.get(&(environment, role, metric)).copied()
    }

    pub fn set(
        &mut self,
        environment: EnvironmentKind,
        role: NodeRole,
        metric: Metric,
        value: f64,
    ) {
        self.values.insert((environment, role, metric), value);
    }

    pub fn set_spec(&mut self, environment: EnvironmentKind, role: NodeRole, spec: NodeSpec) {
        self.set(environment, role, Metric::Cpu, spec.cpu);
        self.set(environment, role, Metric::RamGb, spec.ram_gb);
        self.set(environment, role, Metric::DiskGb, spec.disk_gb);
    }

    pub fn with_spec(
        mut self,
        environment: EnvironmentKind,
        role: NodeRole,
        spec: NodeSpec,
    ) -> Self {
        self.set_spec(environment, role, spec);
        self
    }

    pub fn node_spec(&self, environment: EnvironmentKind, role: NodeRole) -> Option<NodeSpec> {
        Some(NodeSpec::new(
            self.get(environment, role, Metric::Cpu)?,
            self.get(environment, role, Metric::RamGb)?,
            self.get(environment, role, Metric::DiskGb)?,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries of `other` replace entries of `self`
    pub fn merged(&self, other: &NodeSpecTable) -> NodeSpecTable {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(key, value)| (*key, *value)));
        NodeSpecTable { values }
    }
}

impl From<Vec<SpecEntry>> for NodeSpecTable {
    fn from(entries: Vec<SpecEntry>) -> Self {
        let values = entries
            .into_iter()
            .map(|e| ((e.environment, e.role, e.metric), e.value))
            .collect();
        Self { values }
    }
}

impl From<NodeSpecTable> for Vec<SpecEntry> {
    fn from(table: NodeSpecTable) -> Self {
        table
            .values
            .into_iter()
            .map(|((environment, role, metric), value)| SpecEntry {
                environment,
                role,
                metric,
                value,
            })
            .collect()
    }
}

/// Built-in platform distributions
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DistributionKind {
    /// Upstream Kubernetes (kubeadm)
    #[default]
    Kubernetes,
    OpenShift,
    Rke2,
    K3s,
    Tanzu,
    Eks,
    Aks,
    Gke,
}

impl DistributionKind {
    pub fn profile(&self) -> DistributionProfile {
        DistributionProfile::builtin(*self)
    }
}

/// Node specs and capabilities of a platform distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionProfile {
    pub name: String,
    pub prod_control_plane: Option<NodeSpec>,
    pub nonprod_control_plane: Option<NodeSpec>,
    pub prod_worker: Option<NodeSpec>,
    pub nonprod_worker: Option<NodeSpec>,
    pub prod_infra: Option<NodeSpec>,
    pub nonprod_infra: Option<NodeSpec>,
    pub has_infra_nodes: bool,
    pub has_managed_control_plane: bool,
    /// Per-environment replacements for the Prod/NonProd specs
    #[serde(default)]
    pub overrides: NodeSpecTable,
}

impl DistributionProfile {
    pub fn builtin(kind: DistributionKind) -> Self {
        let self_managed = |cp_prod, cp_nonprod, worker_prod, worker_nonprod| Self {
            name: kind.to_string(),
            prod_control_plane: Some(cp_prod),
            nonprod_control_plane: Some(cp_nonprod),
            prod_worker: Some(worker_prod),
            nonprod_worker: Some(worker_nonprod),
            prod_infra: Some(NodeSpec::ZERO),
            nonprod_infra: Some(NodeSpec::ZERO),
            has_infra_nodes: false,
            has_managed_control_plane: false,
            overrides: NodeSpecTable::new(),
        };

        match kind {
            DistributionKind::Kubernetes | DistributionKind::Rke2 | DistributionKind::Tanzu => {
                self_managed(
                    NodeSpec::new(4.0, 16.0, 100.0),
                    NodeSpec::new(2.0, 8.0, 50.0),
                    NodeSpec::new(16.0, 64.0, 200.0),
                    NodeSpec::new(8.0, 32.0, 100.0),
                )
            }
            DistributionKind::K3s => self_managed(
                NodeSpec::new(2.0, 4.0, 50.0),
                NodeSpec::new(1.0, 2.0, 30.0),
                NodeSpec::new(8.0, 32.0, 100.0),
                NodeSpec::new(4.0, 16.0, 50.0),
            ),
            DistributionKind::OpenShift => Self {
                prod_infra: Some(NodeSpec::new(4.0, 16.0, 120.0)),
                nonprod_infra: Some(NodeSpec::new(4.0, 16.0, 120.0)),
                has_infra_nodes: true,
                ..self_managed(
                    NodeSpec::new(8.0, 32.0, 120.0),
                    NodeSpec::new(4.0, 16.0, 120.0),
                    NodeSpec::new(16.0, 64.0, 200.0),
                    NodeSpec::new(8.0, 32.0, 120.0),
                )
            },
            DistributionKind::Eks | DistributionKind::Aks | DistributionKind::Gke => Self {
                has_managed_control_plane: true,
                ..self_managed(
                    NodeSpec::ZERO,
                    NodeSpec::ZERO,
                    NodeSpec::new(16.0, 64.0, 200.0),
                    NodeSpec::new(8.0, 32.0, 100.0),
                )
            },
        }
    }

    fn base_spec(&self, role: NodeRole, production: bool) -> Option<NodeSpec> {
        match (role, production) {
            (NodeRole::ControlPlane, true) => self.prod_control_plane,
            (NodeRole::ControlPlane, false) => self.nonprod_control_plane,
            (NodeRole::Worker, true) => self.prod_worker,
            (NodeRole::Worker, false) => self.nonprod_worker,
            (NodeRole::Infra, true) => self.prod_infra,
            (NodeRole::Infra, false) => self.nonprod_infra,
        }
    }

    /// Spec for a role in an environment: override first, then the
    /// production-like or non-production base spec.
    pub fn node_spec(
        &self,
        environment: EnvironmentKind,
        role: NodeRole,
    ) -> Result<NodeSpec, ConfigurationError> {
        with_fallback(
            environment,
            self.overrides.node_spec(environment, role),
            self.base_spec(role, true),
            self.base_spec(role, false),
        )
        .ok_or_else(|| ConfigurationError::MissingNodeSpec {
            distribution: self.name.clone(),
            environment,
            role,
        })
    }

    /// Copy of this profile with extra per-environment overrides layered on top
    pub fn with_overrides(&self, overrides: &NodeSpecTable) -> Self {
        Self {
            overrides: self.overrides.merged(overrides),
            ..self.clone()
        }
    }
}

/// Application runtime used to size pods
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
pub enum Technology {
    #[default]
    Java,
    DotNet,
    NodeJs,
    Python,
    Go,
    LowCode,
}

impl Technology {
    /// Resource request of one pod of the given tier
    pub fn pod_spec(&self, tier: SizeTier) -> NodeSpec {
        use SizeTier::*;
        match (self, tier) {
            (Technology::Java, Small) => NodeSpec::new(0.5, 1.0, 1.0),
            (Technology::Java, Medium) => NodeSpec::new(1.0, 2.0, 2.0),
            (Technology::Java, Large) => NodeSpec::new(2.0, 4.0, 5.0),
            (Technology::Java, XLarge) => NodeSpec::new(4.0, 8.0, 10.0),
            (Technology::DotNet, Small) => NodeSpec::new(0.25, 0.5, 1.0),
            (Technology::DotNet, Medium) => NodeSpec::new(0.5, 1.0, 2.0),
            (Technology::DotNet, Large) => NodeSpec::new(1.0, 2.0, 5.0),
            (Technology::DotNet, XLarge) => NodeSpec::new(2.0, 4.0, 10.0),
            (Technology::NodeJs | Technology::Python, Small) => NodeSpec::new(0.25, 0.5, 1.0),
            (Technology::NodeJs | Technology::Python, Medium) => NodeSpec::new(0.5, 1.0, 2.0),
            (Technology::NodeJs | Technology::Python, Large) => NodeSpec::new(1.0, 2.0, 4.0),
            (Technology::NodeJs | Technology::Python, XLarge) => NodeSpec::new(2.0, 4.0, 8.0),
            (Technology::Go, Small) => NodeSpec::new(0.1, 0.25, 1.0),
            (Technology::Go, Medium) => NodeSpec::new(0.25, 0.5, 2.0),
            (Technology::Go, Large) => NodeSpec::new(0.5, 1.0, 4.0),
            (Technology::Go, XLarge) => NodeSpec::new(1.0, 2.0, 8.0),
            (Technology::LowCode, Small) => NodeSpec::new(0.5, 1.0, 2.0),
            (Technology::LowCode, Medium) => NodeSpec::new(1.0, 2.0, 4.0),
            (Technology::LowCode, Large) => NodeSpec::new(2.0, 4.0, 8.0),
            (Technology::LowCode, XLarge) => NodeSpec::new(4.0, 8.0, 16.0),
        }
    }
}

/// Server role in a virtual-machine fleet
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServerRole {
    Application,
    Database,
    LoadBalancer,
}

impl ServerRole {
    pub fn vm_spec(&self, tier: SizeTier) -> NodeSpec {
        use SizeTier::*;
        match (self, tier) {
            (ServerRole::Application, Small) => NodeSpec::new(2.0, 4.0, 50.0),
            (ServerRole::Application, Medium) => NodeSpec::new(4.0, 8.0, 100.0),
            (ServerRole::Application, Large) => NodeSpec::new(8.0, 16.0, 100.0),
            (ServerRole::Application, XLarge) => NodeSpec::new(16.0, 32.0, 200.0),
            (ServerRole::Database, Small) => NodeSpec::new(2.0, 8.0, 100.0),
            (ServerRole::Database, Medium) => NodeSpec::new(4.0, 16.0, 250.0),
            (ServerRole::Database, Large) => NodeSpec::new(8.0, 32.0, 500.0),
            (ServerRole::Database, XLarge) => NodeSpec::new(16.0, 64.0, 1000.0),
            (ServerRole::LoadBalancer, Small | Medium) => NodeSpec::new(2.0, 4.0, 40.0),
            (ServerRole::LoadBalancer, Large | XLarge) => NodeSpec::new(4.0, 8.0, 40.0),
        }
    }
}
