use thiserror::Error;

use crate::environment::{EnvironmentKind, NodeRole};

/// Result type for sizing, pricing and projection operations
pub type SizingResult<T> = Result<T, SizingError>;

/// A required lookup was absent and no documented fallback exists
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Distribution has no node spec for a role in an environment
    #[error("Missing {role} node spec for {environment} in distribution '{distribution}'")]
    MissingNodeSpec {
        distribution: String,
        environment: EnvironmentKind,
        role: NodeRole,
    },

    /// Pricing table required by the selected pricing context is absent
    #[error("Missing pricing table: {0}")]
    MissingPricingTable(String),

    /// Service has no rate for the region and no default rate
    #[error("No rate for service '{service}' in region '{region}'")]
    MissingServiceRate { service: String, region: String },

    /// Production environment is not part of the enabled set
    #[error("Production environment must be enabled")]
    ProductionDisabled,
}

/// Errors raised by the capacity engine
#[derive(Debug, Error)]
pub enum SizingError {
    /// Configuration is structurally incomplete
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A computed intermediate broke a hard invariant
    #[error("Policy violation in {environment}: {details}")]
    PolicyViolation {
        environment: EnvironmentKind,
        details: String,
    },

    /// Settings failed range validation
    #[error("Invalid settings: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl SizingError {
    pub(crate) fn policy(environment: EnvironmentKind, details: impl Into<String>) -> Self {
        SizingError::PolicyViolation {
            environment,
            details: details.into(),
        }
    }

    /// Environment the error relates to, when known
    pub fn environment(&self) -> Option<EnvironmentKind> {
        match self {
            SizingError::Configuration(ConfigurationError::MissingNodeSpec {
                environment, ..
            }) => Some(*environment),
            SizingError::PolicyViolation { environment, .. } => Some(*environment),
            _ => None,
        }
    }
}
