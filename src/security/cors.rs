//! Origin allow-list policy and its middleware.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::observability::metrics;

/// Allow-list entry that admits every origin.
pub const WILDCARD: &str = "*";

/// Methods advertised to allowed preflight requests.
pub const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// A request origin rejected by the policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("CORS not allowed for Origin \"{}\".", .origin.as_deref().unwrap_or("<none>"))]
pub struct CorsRejection {
    pub origin: Option<String>,
}

/// Outcome of evaluating one request origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    Allowed,
    Denied(CorsRejection),
}

impl CorsDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CorsDecision::Allowed)
    }
}

/// Allow-list built from the comma-separated `api_cors_domain_csv`.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: HashSet<String>,
    allow_all: bool,
}

impl CorsPolicy {
    /// Split the CSV into literal origins. Entries are trimmed and empty
    /// entries dropped; matching stays exact and case-sensitive.
    pub fn from_csv(csv: &str) -> Self {
        let origins: HashSet<String> = csv
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        let allow_all = origins.contains(WILDCARD);
        Self { origins, allow_all }
    }

    pub fn allows_all(&self) -> bool {
        self.allow_all
    }

    /// Decide whether `origin` may call the API.
    pub fn evaluate(&self, origin: Option<&str>) -> CorsDecision {
        if self.allow_all {
            return CorsDecision::Allowed;
        }
        match origin {
            Some(o) if self.origins.contains(o) => CorsDecision::Allowed,
            _ => CorsDecision::Denied(CorsRejection {
                origin: origin.map(str::to_string),
            }),
        }
    }
}

impl IntoResponse for CorsRejection {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Enforce the policy on every API request.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    if let CorsDecision::Denied(rejection) = policy.evaluate(origin.as_deref()) {
        tracing::warn!(origin = ?origin, path = %req.uri().path(), "Request origin denied");
        metrics::record_cors_denied();
        return rejection.into_response();
    }

    let allow_origin = origin.as_deref().and_then(|o| HeaderValue::from_str(o).ok());

    let is_preflight = req.method() == Method::OPTIONS
        && req.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
    if is_preflight {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        apply_origin_headers(&mut response, allow_origin);
        return response;
    }

    let mut response = next.run(req).await;
    apply_origin_headers(&mut response, allow_origin);
    response
}

fn apply_origin_headers(response: &mut Response, origin: Option<HeaderValue>) {
    let headers = response.headers_mut();
    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}
