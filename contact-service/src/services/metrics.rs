//! Metrics collection for contact-service.
//!
//! Counters are recorded through the `metrics` facade and rendered by the
//! Prometheus exporter at `/metrics`. Until [`init_metrics`] runs the
//! macros are no-ops, which keeps tests free of global recorder state.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Call once, from `main`.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already initialized"))?;

    metrics::describe_counter!(
        "contact_submissions_total",
        "Contact form submissions by terminal outcome"
    );
    metrics::describe_counter!(
        "contact_provider_calls_total",
        "Outbound provider API calls by provider and status"
    );

    Ok(())
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record how a submission ended: `delivered`, `missing_fields`,
/// `email_rejected` or `delivery_failed`.
pub fn record_submission(outcome: &'static str) {
    counter!("contact_submissions_total", "outcome" => outcome).increment(1);
}

/// Record a provider API call.
pub fn record_provider_call(provider: &'static str, status: &'static str) {
    counter!(
        "contact_provider_calls_total",
        "provider" => provider,
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_before_init() {
        if METRICS_HANDLE.get().is_none() {
            assert!(get_metrics().starts_with("# Metrics recorder not initialized"));
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_submission("delivered");
        record_provider_call("twilio", "success");
    }
}
