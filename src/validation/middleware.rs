//! Axum middleware running the [`RequestValidator`] in front of the routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::body::JsonBody;
use crate::http::health::HEALTHCHECK_PATH;
use crate::observability::metrics;
use crate::validation::validator::{RequestRejection, RequestValidator, RequestView};

/// Reject requests that do not conform to the API document.
///
/// Expects the JSON body parser to have run first; the parsed body is read
/// from the [`JsonBody`] extension. Liveness checks on `/healthcheck` pass
/// whatever the document declares.
pub async fn validate_request(
    State(validator): State<Arc<RequestValidator>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(rejection) = check(&validator, &req) {
        tracing::debug!(
            method = %req.method(),
            path = %req.uri().path(),
            status = rejection.status().as_u16(),
            errors = ?rejection.errors(),
            "Request rejected by validator"
        );
        metrics::record_validation_rejected(rejection.status().as_u16());
        return rejection.into_response();
    }
    next.run(req).await
}

fn check(validator: &RequestValidator, req: &Request<Body>) -> Result<(), RequestRejection> {
    if is_liveness_check(req) {
        return Ok(());
    }
    let query: HashMap<String, String> = match Query::try_from_uri(req.uri()) {
        Ok(Query(query)) => query,
        Err(e) => return Err(RequestRejection::InvalidParameters(vec![e.body_text()])),
    };
    let headers = req.headers();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let has_body = declared_length.is_some_and(|n| n > 0)
        || headers.contains_key(header::TRANSFER_ENCODING);

    validator.validate(&RequestView {
        method: req.method(),
        path: req.uri().path(),
        query: &query,
        json_body: req.extensions().get::<JsonBody>().map(|b| b.0.as_ref()),
        content_type,
        has_body,
    })
}

fn is_liveness_check(req: &Request<Body>) -> bool {
    req.uri().path() == HEALTHCHECK_PATH
        && (req.method() == Method::GET || req.method() == Method::HEAD)
}
