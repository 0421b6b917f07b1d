//! API router composition.
//!
//! The API middleware stack is installed in a fixed order, enforced by
//! [`ApiRouterBuilder`]:
//!
//! ```text
//! compression → CORS → JSON body parser → request validation
//!     → /healthcheck → storage plugin → business routes
//! ```
//!
//! Every layer wraps every route, so validation always runs before a
//! handler and CORS always runs before validation.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::MethodRouter,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::body::parse_json_body;
use crate::http::health::{self, HEALTHCHECK_PATH};
use crate::security::{cors_middleware, CorsPolicy};
use crate::storage::PluginHandle;
use crate::validation::{validate_request, RequestValidator};

/// State shared with every business route.
#[derive(Clone)]
pub struct ApiState {
    pub storage: PluginHandle,
    pub config: Arc<ServerConfig>,
}

/// A business route served on the API listener.
pub trait Endpoint: Send + Sync {
    /// Route path in axum syntax (`/items/{id}`).
    fn path(&self) -> &'static str;

    fn method_router(&self) -> MethodRouter<ApiState>;
}

/// Composition stages, in the only order they may be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Empty,
    Compression,
    Cors,
    JsonBody,
    Validation,
    Healthcheck,
    Storage,
    Routes,
}

impl Stage {
    fn next(self) -> Option<Stage> {
        match self {
            Stage::Empty => Some(Stage::Compression),
            Stage::Compression => Some(Stage::Cors),
            Stage::Cors => Some(Stage::JsonBody),
            Stage::JsonBody => Some(Stage::Validation),
            Stage::Validation => Some(Stage::Healthcheck),
            Stage::Healthcheck => Some(Stage::Storage),
            Stage::Storage => Some(Stage::Routes),
            Stage::Routes => None,
        }
    }
}

/// Error type for API router composition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("cannot install {attempted:?} after {current:?}")]
    OutOfOrder { current: Stage, attempted: Stage },

    #[error("router composition stopped at {0:?}")]
    Incomplete(Stage),

    #[error("route {0} is registered twice")]
    DuplicateRoute(String),
}

/// Builder for the API listener's router.
pub struct ApiRouterBuilder {
    stage: Stage,
    cors: Option<Arc<CorsPolicy>>,
    body_limit: usize,
    validator: Option<Arc<RequestValidator>>,
    state: Option<ApiState>,
    paths: BTreeSet<&'static str>,
    routes: Router<ApiState>,
}

impl Default for ApiRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRouterBuilder {
    pub fn new() -> Self {
        Self {
            stage: Stage::Empty,
            cors: None,
            body_limit: 0,
            validator: None,
            state: None,
            paths: BTreeSet::new(),
            routes: Router::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, attempted: Stage) -> Result<(), BuildError> {
        if self.stage.next() != Some(attempted) {
            return Err(BuildError::OutOfOrder {
                current: self.stage,
                attempted,
            });
        }
        tracing::debug!(stage = ?attempted, "API router stage installed");
        self.stage = attempted;
        Ok(())
    }

    pub fn compression(mut self) -> Result<Self, BuildError> {
        self.advance(Stage::Compression)?;
        Ok(self)
    }

    pub fn cors(mut self, policy: CorsPolicy) -> Result<Self, BuildError> {
        self.advance(Stage::Cors)?;
        self.cors = Some(Arc::new(policy));
        Ok(self)
    }

    pub fn json_body(mut self, limit: usize) -> Result<Self, BuildError> {
        self.advance(Stage::JsonBody)?;
        self.body_limit = limit;
        Ok(self)
    }

    pub fn validation(mut self, validator: RequestValidator) -> Result<Self, BuildError> {
        self.advance(Stage::Validation)?;
        self.validator = Some(Arc::new(validator));
        Ok(self)
    }

    pub fn healthcheck(mut self) -> Result<Self, BuildError> {
        self.advance(Stage::Healthcheck)?;
        self.paths.insert(HEALTHCHECK_PATH);
        self.routes = self.routes.merge(health::routes::<ApiState>());
        Ok(self)
    }

    pub fn storage(mut self, storage: PluginHandle, config: Arc<ServerConfig>) -> Result<Self, BuildError> {
        self.advance(Stage::Storage)?;
        self.state = Some(ApiState { storage, config });
        Ok(self)
    }

    pub fn routes(mut self, endpoints: &[Arc<dyn Endpoint>]) -> Result<Self, BuildError> {
        self.advance(Stage::Routes)?;
        for endpoint in endpoints {
            let path = endpoint.path();
            if !self.paths.insert(path) {
                return Err(BuildError::DuplicateRoute(path.to_string()));
            }
            self.routes = self.routes.route(path, endpoint.method_router());
        }
        Ok(self)
    }

    /// Finish composition. Every stage must have been installed.
    pub fn build(self) -> Result<Router, BuildError> {
        let (Stage::Routes, Some(cors), Some(validator), Some(state)) =
            (self.stage, self.cors, self.validator, self.state)
        else {
            return Err(BuildError::Incomplete(self.stage));
        };
        let limit = self.body_limit;

        Ok(self
            .routes
            .with_state(state)
            .layer(middleware::from_fn_with_state(validator, validate_request))
            .layer(RequestBodyLimitLayer::new(limit))
            .layer(middleware::from_fn_with_state(limit, parse_json_body))
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(CompressionLayer::new())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)))
    }
}
