//! Configuration for the capacity planner

use domain_sizing::CalculatorSettings;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Invalid planner settings: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Deployment environment of the planner process itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env_or_default("APP_ENV", "development");
        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a variable, falling back to `default` when unset
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub environment: Environment,
    pub calculator: CalculatorSettings,
}

impl FromEnv for PlannerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = CalculatorSettings::default();
        let calculator = CalculatorSettings {
            min_worker_nodes: env_parse("PLANNER_MIN_WORKER_NODES", defaults.min_worker_nodes)?,
            managed_min_worker_nodes: env_parse(
                "PLANNER_MANAGED_MIN_WORKER_NODES",
                defaults.managed_min_worker_nodes,
            )?,
            apps_per_infra_node: env_parse(
                "PLANNER_APPS_PER_INFRA_NODE",
                defaults.apps_per_infra_node,
            )?,
            max_infra_nodes: env_parse("PLANNER_MAX_INFRA_NODES", defaults.max_infra_nodes)?,
            large_deployment_app_threshold: env_parse(
                "PLANNER_LARGE_DEPLOYMENT_APPS",
                defaults.large_deployment_app_threshold,
            )?,
            min_prod_infra_large: env_parse(
                "PLANNER_MIN_PROD_INFRA_LARGE",
                defaults.min_prod_infra_large,
            )?,
            large_cluster_worker_threshold: env_parse(
                "PLANNER_LARGE_CLUSTER_WORKERS",
                defaults.large_cluster_worker_threshold,
            )?,
            ..defaults
        };
        calculator.validate()?;

        Ok(Self {
            environment: Environment::from_env(),
            calculator,
        })
    }
}
