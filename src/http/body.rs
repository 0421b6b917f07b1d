//! Size-limited JSON body parsing for the API listener.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::validation::validator::is_json_media_type;

/// Parsed JSON request body, stored as a request extension.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Arc<Value>);

/// A JSON body that could not be accepted.
#[derive(Debug, thiserror::Error)]
pub enum BodyRejection {
    #[error("request body exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("request body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        let status = match self {
            BodyRejection::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            BodyRejection::Malformed(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_media_type)
}

/// Buffer and parse JSON request bodies up to `limit` bytes.
///
/// The buffered bytes are put back so downstream extractors can still read
/// the body. Non-JSON and empty bodies pass through untouched.
pub async fn parse_json_body(State(limit): State<usize>, req: Request<Body>, next: Next) -> Response {
    if !declares_json(req.headers()) {
        return next.run(req).await;
    }

    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|n| n > limit) {
        return BodyRejection::TooLarge { limit }.into_response();
    }

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, limit, "Failed to buffer JSON body");
            return BodyRejection::TooLarge { limit }.into_response();
        }
    };

    if bytes.is_empty() {
        return next.run(Request::from_parts(parts, Body::empty())).await;
    }

    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => return BodyRejection::Malformed(e).into_response(),
    };

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(JsonBody(Arc::new(value)));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::post, Router};
    use tower::ServiceExt;

    fn app(limit: usize) -> Router {
        Router::new()
            .route(
                "/echo",
                post(|req: Request<Body>| async move {
                    match req.extensions().get::<JsonBody>() {
                        Some(JsonBody(value)) => Json(value.as_ref().clone()).into_response(),
                        None => StatusCode::NO_CONTENT.into_response(),
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(limit, parse_json_body))
    }

    fn request(content_type: &str, body: &'static str) -> Request<Body> {
        Request::post("/echo")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn parses_json_into_extension() {
        let response = app(1024)
            .oneshot(request("application/json", r#"{"a":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let response = app(1024)
            .oneshot(request("application/json", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_json_is_413() {
        let response = app(4)
            .oneshot(request("application/json", r#"{"a":12345}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn other_media_types_pass_through() {
        let response = app(4)
            .oneshot(request("text/plain", "not json at all"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
