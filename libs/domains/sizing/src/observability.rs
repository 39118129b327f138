//! Engine metrics. Recording is a no-op unless the host process installs a recorder.

use metrics::{counter, gauge, histogram};
use std::time::Instant;

use crate::cost::CostEstimate;
use crate::growth::GrowthProjection;
use crate::sizing::SizingOutcome;

/// Capacity engine metrics recorder
pub struct PlannerMetrics;

impl PlannerMetrics {
    // =========================================================================
    // Sizing
    // =========================================================================

    pub fn record_sizing(outcome: &SizingOutcome) {
        counter!(
            "capacity_sizing_runs_total",
            "distribution" => outcome.distribution.clone(),
            "mode" => outcome.cluster_mode.to_string()
        )
        .increment(1);
        gauge!("capacity_sizing_nodes", "distribution" => outcome.distribution.clone())
            .set(f64::from(outcome.grand_total.total_nodes));
    }

    pub fn record_sizing_failed(error: &str) {
        counter!("capacity_sizing_failures_total").increment(1);
        tracing::error!(error = error, "Sizing failed");
    }

    // =========================================================================
    // Cost
    // =========================================================================

    pub fn record_estimate(estimate: &CostEstimate) {
        counter!("capacity_estimates_total", "provider" => estimate.provider.clone()).increment(1);
        gauge!("capacity_estimate_monthly_total", "provider" => estimate.provider.clone())
            .set(estimate.monthly_total);
    }

    // =========================================================================
    // Growth
    // =========================================================================

    pub fn record_projection(projection: &GrowthProjection) {
        for warning in &projection.warnings {
            counter!(
                "capacity_projection_warnings_total",
                "kind" => warning.kind.to_string(),
                "severity" => warning.severity.to_string()
            )
            .increment(1);
        }
        gauge!("capacity_projection_recommendations").set(projection.recommendations.len() as f64);
    }
}

/// Records `capacity_engine_duration_seconds` when stopped or dropped
pub struct PlannerTimer {
    start: Instant,
    stage: &'static str,
    stopped: bool,
}

impl PlannerTimer {
    pub fn new(stage: &'static str) -> Self {
        Self {
            start: Instant::now(),
            stage,
            stopped: false,
        }
    }

    /// Stop the timer; returns elapsed seconds
    pub fn stop(&mut self) -> f64 {
        if self.stopped {
            return 0.0;
        }
        self.stopped = true;

        let elapsed = self.start.elapsed().as_secs_f64();
        histogram!("capacity_engine_duration_seconds", "stage" => self.stage).record(elapsed);
        elapsed
    }
}

impl Drop for PlannerTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_stops_once() {
        let mut timer = PlannerTimer::new("sizing");
        assert!(timer.stop() >= 0.0);
        assert_eq!(timer.stop(), 0.0);
    }
}
