//! Prometheus metrics for fan-out runs.
//!
//! This module provides metrics for:
//! - Runs (outcome per strategy, duration)
//! - Individual fetches (result, in-flight count)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Run Metrics
// =============================================================================

/// Runs total by strategy and outcome.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_runs_total", "Total fan-out runs"),
        &["strategy", "outcome"], // outcome: "completed", "fetch_failed", "cancelled", ...
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("fanout_run_duration_seconds", "Duration of fan-out runs")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
        &["strategy"],
    )
    .unwrap()
});

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Fetches total by result.
pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_fetches_total", "Total fetch calls"),
        &["result"], // "success", "failed", "discarded"
    )
    .unwrap()
});

/// Fetches currently executing across all runs.
pub static FETCHES_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "fanout_fetches_in_flight",
        "Number of fetch calls currently executing",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(FETCHES_TOTAL.clone()),
        Box::new(FETCHES_IN_FLIGHT.clone()),
    ]
}

/// Encode the registry in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_registered_metrics() {
        RUNS_TOTAL.with_label_values(&["semaphore", "completed"]).inc();
        FETCHES_TOTAL.with_label_values(&["success"]).inc();

        let text = encode_metrics();
        assert!(text.contains("fanout_runs_total"));
        assert!(text.contains("fanout_fetches_total"));
    }

    #[test]
    fn test_register_metrics_on_fresh_registry() {
        let registry = Registry::new();
        register_metrics(&registry);
        FETCHES_IN_FLIGHT.inc();
        FETCHES_IN_FLIGHT.dec();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"fanout_fetches_in_flight".to_string()));
    }

    #[test]
    #[should_panic]
    fn test_register_metrics_twice_panics() {
        let registry = Registry::new();
        register_metrics(&registry);
        register_metrics(&registry);
    }

    #[test]
    fn test_all_metrics_count() {
        assert_eq!(all_metrics().len(), 4);
    }
}
