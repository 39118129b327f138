//! Prometheus recorder for engine metrics, rendered on demand.

use eyre::{Result, WrapErr};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder; call at most once per process
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .wrap_err("Failed to install Prometheus recorder")?;
    register_metric_descriptions();
    info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

fn register_metric_descriptions() {
    describe_counter!("capacity_sizing_runs_total", "Completed sizing runs");
    describe_counter!("capacity_sizing_failures_total", "Sizing runs rejected with an error");
    describe_gauge!("capacity_sizing_nodes", "Nodes in the last sizing outcome");
    describe_counter!("capacity_estimates_total", "Completed cost estimates");
    describe_gauge!(
        "capacity_estimate_monthly_total",
        "Monthly total of the last cost estimate"
    );
    describe_counter!(
        "capacity_projection_warnings_total",
        "Cluster limit warnings raised by growth projections"
    );
    describe_gauge!(
        "capacity_projection_recommendations",
        "Recommendations in the last growth projection"
    );
    describe_histogram!(
        "capacity_engine_duration_seconds",
        "Duration of each engine stage in seconds"
    );
}
