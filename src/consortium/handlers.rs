//! Handlers for `/api/v1/consortium`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::consortium::model::{storage_key, ConsortiumV1, CreateConsortiumRequestV1};
use crate::http::{ApiState, Endpoint};

/// Error type for consortium handlers.
#[derive(Debug, thiserror::Error)]
pub enum ConsortiumError {
    #[error("consortium {0:?} not found")]
    NotFound(String),

    #[error("stored consortium {id:?} is corrupt: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl IntoResponse for ConsortiumError {
    fn into_response(self) -> Response {
        let status = match &self {
            ConsortiumError::NotFound(_) => StatusCode::NOT_FOUND,
            ConsortiumError::Corrupt { .. } | ConsortiumError::Storage(_) => {
                tracing::error!(error = %self, "Consortium request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &self {
            ConsortiumError::NotFound(_) => self.to_string(),
            _ => "internal server error".to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub async fn create_consortium(
    State(state): State<ApiState>,
    Json(request): Json<CreateConsortiumRequestV1>,
) -> Result<(StatusCode, Json<ConsortiumV1>), ConsortiumError> {
    let consortium = ConsortiumV1::create(request, Utc::now());
    let value = serde_json::to_value(&consortium).map_err(|e| ConsortiumError::Corrupt {
        id: consortium.id.clone(),
        source: e,
    })?;
    state
        .storage
        .set(&consortium.storage_key(), value)
        .await
        .map_err(ConsortiumError::Storage)?;

    tracing::info!(id = %consortium.id, name = %consortium.consortium_name, "Consortium created");
    Ok((StatusCode::CREATED, Json(consortium)))
}

pub async fn get_consortium(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ConsortiumV1>, ConsortiumError> {
    let value = state
        .storage
        .get(&storage_key(&id))
        .await
        .map_err(ConsortiumError::Storage)?
        .ok_or_else(|| ConsortiumError::NotFound(id.clone()))?;
    let consortium = serde_json::from_value(value).map_err(|e| ConsortiumError::Corrupt { id, source: e })?;
    Ok(Json(consortium))
}

/// `POST /api/v1/consortium`
pub struct CreateConsortiumEndpoint;

impl Endpoint for CreateConsortiumEndpoint {
    fn path(&self) -> &'static str {
        "/api/v1/consortium"
    }

    fn method_router(&self) -> MethodRouter<ApiState> {
        post(create_consortium)
    }
}

/// `GET /api/v1/consortium/{consortiumId}`
pub struct GetConsortiumEndpoint;

impl Endpoint for GetConsortiumEndpoint {
    fn path(&self) -> &'static str {
        "/api/v1/consortium/{consortiumId}"
    }

    fn method_router(&self) -> MethodRouter<ApiState> {
        get(get_consortium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::Request, Router};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::loader::load_config_from_str;
    use crate::storage::{MemoryKvStorage, PluginHandle};

    fn state(storage: PluginHandle) -> ApiState {
        let config = load_config_from_str(
            r#"
            api_host = "127.0.0.1"
            api_port = 0
            cockpit_host = "127.0.0.1"
            cockpit_port = 0
            cockpit_www_root = "www"
            api_cors_domain_csv = "*"
            storage_plugin_package = "bif-plugin-kv-storage-memory"
            storage_plugin_options_json = "{}"
            log_level = "info"
            "#,
            |_| None,
        )
        .unwrap();
        ApiState {
            storage,
            config: Arc::new(config),
        }
    }

    fn app(storage: PluginHandle) -> Router {
        let mut router = Router::new();
        for endpoint in crate::consortium::endpoints() {
            router = router.route(endpoint.path(), endpoint.method_router());
        }
        router.with_state(state(storage))
    }

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_then_get() {
        let storage: PluginHandle = Arc::new(MemoryKvStorage::default());

        let response = app(storage.clone())
            .oneshot(
                Request::post("/api/v1/consortium")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"consortiumName":"c","organizationName":"o","baseUrl":"http://x"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(storage.has(&storage_key(&id)).await.unwrap());

        let response = app(storage)
            .oneshot(
                Request::get(format!("/api/v1/consortium/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, created);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let response = app(Arc::new(MemoryKvStorage::default()))
            .oneshot(Request::get("/api/v1/consortium/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await["message"], "consortium \"nope\" not found");
    }

    #[tokio::test]
    async fn corrupt_record_is_500() {
        let storage: PluginHandle = Arc::new(MemoryKvStorage::default());
        storage.set(&storage_key("bad"), json!(42)).await.unwrap();
        let response = app(storage)
            .oneshot(Request::get("/api/v1/consortium/bad").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
