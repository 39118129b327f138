//! Capacity Planner
//!
//! Sizes container platforms and VM fleets, prices them on-prem, in the
//! cloud or under a platform license, and projects growth. Reads JSON
//! requests and prints JSON reports.

use clap::{Parser, Subcommand};
use domain_sizing::cost::ProviderProfile;
use domain_sizing::{
    DistributionKind, DistributionProfile, PlanRequest, PlannerService, PricingCatalog,
    SizingInput,
};
use eyre::Result;
use std::path::PathBuf;
use strum::IntoEnumIterator;
use tracing::info;

mod config;
mod exporter;
mod report;
mod telemetry;

use config::{FromEnv, PlannerConfig};
use report::Report;

#[derive(Parser)]
#[command(name = "capacity-planner")]
#[command(about = "Size, price and project container platform capacity")]
struct Cli {
    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Size every enabled environment from a sizing input file
    Size {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run sizing, pricing and growth projection from a plan request file
    Plan {
        #[arg(short, long)]
        request: PathBuf,
    },

    /// List built-in distribution profiles
    Distributions,

    /// List built-in cloud rate cards
    Providers,
}

fn main() -> Result<()> {
    telemetry::install_color_eyre();

    let config = PlannerConfig::from_env()?;
    telemetry::init_tracing(&config.environment);

    let cli = Cli::parse();
    let metrics = if cli.metrics {
        Some(exporter::init_metrics()?)
    } else {
        None
    };

    let service = PlannerService::new(config.calculator, PricingCatalog::builtin());

    let body = match cli.command {
        Commands::Size { input } => {
            let input: SizingInput = report::read_json(&input)?;
            let outcome = service.size(&input)?;
            info!(
                environments = outcome.environments.len(),
                total_nodes = outcome.grand_total.total_nodes,
                "Sizing complete"
            );
            Report::new("sizing", outcome).to_json()?
        }

        Commands::Plan { request } => {
            let request: PlanRequest = report::read_json(&request)?;
            let plan = service.plan(&request)?;
            if let Some(cost) = &plan.cost {
                info!(monthly_total = %cost.monthly_money(), "Plan priced");
            }
            Report::new("plan", plan).to_json()?
        }

        Commands::Distributions => {
            let profiles: Vec<DistributionProfile> =
                DistributionKind::iter().map(|kind| kind.profile()).collect();
            Report::new("distributions", profiles).to_json()?
        }

        Commands::Providers => {
            let providers: Vec<&ProviderProfile> = service.catalog().providers.values().collect();
            Report::new("providers", providers).to_json()?
        }
    };

    report::write_output(&body, cli.output.as_deref())?;

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(json: &str) -> domain_sizing::CapacityReport {
        let request: PlanRequest = serde_json::from_str(json).unwrap();
        PlannerService::default().plan(&request).unwrap()
    }

    #[test]
    fn test_bundled_sizing_request() {
        let input: SizingInput =
            serde_json::from_str(include_str!("../requests/sizing-openshift.json")).unwrap();
        let outcome = PlannerService::default().size(&input).unwrap();
        assert_eq!(outcome.environments.len(), 5);
        assert!(outcome.grand_total.infra > 0);
    }

    #[test]
    fn test_bundled_cloud_plan() {
        let report = plan(include_str!("../requests/plan-eks.json"));
        let cost = report.cost.unwrap();
        assert_eq!(cost.region, "eu-west-1");
        let growth = report.growth.unwrap();
        assert_eq!(growth.points.len(), 5);
        assert!(!growth.recommendations.is_empty());
    }

    #[test]
    fn test_bundled_licensed_plan() {
        let report = plan(include_str!("../requests/plan-licensed.json"));
        assert_eq!(report.cost.unwrap().provider, "low-code");
    }

    #[test]
    fn test_cli_parses_global_output() {
        let cli = Cli::try_parse_from([
            "capacity-planner",
            "plan",
            "-r",
            "req.json",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }
}
