//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversion engine (results, active pipelines, duration)
//! - Reply delivery (attachment outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidconv_conversions_total", "Total video conversions"),
        &["result"], // "done", "network", "unsupported_format", "storage", "transcode", "cancelled", "abandoned"
    )
    .unwrap()
});

/// Pipelines currently holding an admission permit.
pub static CONVERSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vidconv_conversions_active",
        "Number of conversions currently running",
    )
    .unwrap()
});

/// Conversion duration in seconds, from request to the terminal state.
///
/// Includes time spent queued for an admission permit.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vidconv_conversion_duration_seconds",
            "Duration of video conversions",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Delivery Metrics
// =============================================================================

/// Presenter outcomes by result.
pub static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidconv_deliveries_total", "Total reply deliveries"),
        &["result"], // "delivered", "failed", "abandoned"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSIONS_ACTIVE.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(DELIVERIES_TOTAL.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        CONVERSIONS_TOTAL.with_label_values(&["done"]).inc();
        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"vidconv_conversions_total".to_string()));
    }
}
