//! Capacity Sizing Domain
//!
//! Sizing, pricing and growth projection for container platforms and
//! virtual-machine fleets.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  PlannerService  │  ← Validation, metrics, stage wiring
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐     ┌───────────────┐
//! │ SizingCalculator │ ──► │ ResourceSpecs │  ← Distribution, pod and VM specs
//! └────────┬─────────┘     └───────────────┘
//!          │
//! ┌────────▼─────────┐     ┌───────────────┐
//! │  CostEstimator   │ ──► │  HA/DR model  │  ← Compute cost multiplier
//! └────────┬─────────┘     │ Tier resolver │  ← Instance, user and pack tiers
//!          │               └───────────────┘
//! ┌────────▼─────────┐
//! │ GrowthProjector  │  ← Yearly projection, limit warnings
//! └──────────────────┘
//! ```
//!
//! Every stage is a pure function of its inputs; results are rebuilt on
//! each call and never mutated afterwards.

pub mod cost;
pub mod environment;
pub mod error;
pub mod growth;
pub mod ha_dr;
pub mod observability;
pub mod policy;
pub mod resource_specs;
pub mod service;
pub mod sizing;
pub mod tiered;

// Re-export commonly used types
pub use cost::{
    CloudPricing, CloudProvider, CostCategory, CostEstimate, CostEstimator, Currency, Discount,
    DiscountKind, DiscountScope, EnvironmentWeighting, LicensedPlatformPricing, Money,
    OnPremCostBasis, PricingCatalog, PricingContext, PricingType,
};
pub use environment::{AppCounts, AppTierCounts, EnvironmentKind, NodeRole, SizeTier};
pub use error::{ConfigurationError, SizingError, SizingResult};
pub use growth::{GrowthBaseline, GrowthPattern, GrowthProjection, GrowthProjector, GrowthSettings};
pub use ha_dr::{HaDrConfig, multiplier};
pub use policy::{CalculatorSettings, HaPattern, PolicySettings};
pub use resource_specs::{
    DistributionKind, DistributionProfile, NodeSpec, NodeSpecTable, Technology,
};
pub use service::{CapacityReport, PlanRequest, PlannerService};
pub use sizing::{
    ClusterMode, EnvironmentResult, GrandTotal, SizingCalculator, SizingInput, SizingOutcome,
};
pub use tiered::{PackAllocation, TierTable, resolve_pack_count, resolve_tier};
