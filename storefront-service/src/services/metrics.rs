use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; only the
/// first call installs anything.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Checkout sessions opened with the gateway, by result.
pub fn record_payment_init(result: &'static str) {
    counter!("payment_init_total", "result" => result).increment(1);
}

/// Callbacks received, by callback kind and what they did to the order.
pub fn record_callback(kind: &'static str, outcome: &'static str) {
    counter!("payment_callbacks_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Individual calls to the gateway's validation API, by result.
pub fn record_validation_attempt(result: &'static str) {
    counter!("payment_validation_attempts_total", "result" => result).increment(1);
}

pub fn record_admin_override(to: &'static str) {
    counter!("order_admin_overrides_total", "to" => to).increment(1);
}
