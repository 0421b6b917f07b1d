//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_listener_state` (gauge): state code per listener, see [`state_code`]
//! - `api_cors_denied_total` (counter): requests rejected by the origin policy
//! - `api_validation_rejected_total` (counter): requests rejected by the
//!   validator, labelled by status
//! - `api_storage_plugin_loads_total` (counter): plugin loads by package and outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::net::ListenerState;

/// Install the Prometheus recorder with its own scrape listener.
///
/// Must be called from inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Numeric encoding of a listener state for the gauge.
pub fn state_code(state: ListenerState) -> f64 {
    match state {
        ListenerState::Unbound => 0.0,
        ListenerState::Binding => 1.0,
        ListenerState::Bound => 2.0,
        ListenerState::Closing => 3.0,
        ListenerState::Closed => 4.0,
        ListenerState::BindFailed => 5.0,
        ListenerState::CloseFailed => 6.0,
    }
}

pub fn record_listener_state(listener: &'static str, state: ListenerState) {
    metrics::gauge!("api_listener_state", "listener" => listener).set(state_code(state));
}

pub fn record_cors_denied() {
    metrics::counter!("api_cors_denied_total").increment(1);
}

pub fn record_validation_rejected(status: u16) {
    metrics::counter!("api_validation_rejected_total", "status" => status.to_string())
        .increment(1);
}

pub fn record_plugin_load(package: &str, success: bool) {
    metrics::counter!(
        "api_storage_plugin_loads_total",
        "package" => package.to_string(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}
