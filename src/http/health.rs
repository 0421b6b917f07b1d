//! Liveness endpoint of the API listener.

use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub const HEALTHCHECK_PATH: &str = "/healthcheck";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthCheckResponse {
    pub success: bool,
    /// RFC 3339 timestamp with millisecond precision.
    pub timestamp: String,
}

impl HealthCheckResponse {
    pub fn now() -> Self {
        Self {
            success: true,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub async fn healthcheck() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::now())
}

/// Router exposing `GET /healthcheck`.
pub fn routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route(HEALTHCHECK_PATH, get(healthcheck))
}
