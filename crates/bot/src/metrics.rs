//! Prometheus metrics for observability.
//!
//! The registry holds the bot's own inbound-message counter and every core
//! metric (conversions and deliveries).

use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::{self, Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Inbound Message Metrics
// =============================================================================

/// Inbound messages by what the controller made of them.
pub static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidconv_messages_total", "Total inbound chat messages"),
        &["source"], // "video", "document", "url", "ignored"
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let mut collectors: Vec<Box<dyn Collector>> = vec![Box::new(MESSAGES_TOTAL.clone())];
    collectors.extend(vidconv_core::metrics::all_metrics());

    for metric in collectors {
        if let Err(e) = registry.register(metric) {
            warn!(error = %e, "Failed to register metric");
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        MESSAGES_TOTAL.with_label_values(&["url"]).inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("vidconv_messages_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        vidconv_core::metrics::CONVERSIONS_TOTAL
            .with_label_values(&["done"])
            .inc();
        vidconv_core::metrics::CONVERSIONS_ACTIVE.set(0);
        vidconv_core::metrics::DELIVERIES_TOTAL
            .with_label_values(&["delivered"])
            .inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("vidconv_conversions_total"));
        assert!(output.contains("vidconv_conversions_active"));
        assert!(output.contains("vidconv_deliveries_total"));
    }
}
