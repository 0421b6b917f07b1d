//! Startup orchestration for the two listeners.
//!
//! The cockpit file server binds first. The API listener is composed in the
//! fixed [`ApiRouterBuilder`] order and binds only after the validator is
//! installed and the storage plugin is loaded. Any startup failure closes
//! whatever is already bound before the error is returned.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde_json::Value;
use tracing::Instrument;

use crate::config::{validate_config, ConfigError, ServerConfig};
use crate::http::files::{cockpit_router, resolve_www_root};
use crate::http::{ApiRouterBuilder, BuildError, Endpoint};
use crate::lifecycle::shutdown::ShutdownReport;
use crate::net::{ListenerError, ListenerHandle, ListenerState};
use crate::openapi;
use crate::security::CorsPolicy;
use crate::storage::{PluginError, PluginHandle, PluginLoader, PluginRegistry};
use crate::validation::{RequestValidator, SchemaError};

pub const COCKPIT_LISTENER: &str = "cockpit";
pub const API_LISTENER: &str = "api";

/// Error type for [`ApiServer::start`].
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("server has already been started")]
    AlreadyStarted,

    #[error("{listener} listener: {source}")]
    Listener {
        listener: &'static str,
        #[source]
        source: ListenerError,
    },

    #[error("cannot resolve cockpit document root: {0}")]
    WwwRoot(#[source] std::io::Error),

    #[error("bundled API document is not valid JSON: {0}")]
    Document(#[source] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Owner of the cockpit and API listeners.
pub struct ApiServer {
    config: Arc<ServerConfig>,
    loader: PluginLoader,
    document: Option<Value>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    cockpit: ListenerHandle,
    api: ListenerHandle,
    storage: Option<PluginHandle>,
    started: bool,
    span: tracing::Span,
}

impl ApiServer {
    /// Validate `config` and prepare both listeners, unbound.
    pub fn new(config: ServerConfig, registry: PluginRegistry) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(Self {
            config: Arc::new(config),
            loader: PluginLoader::new(registry),
            document: None,
            endpoints: Vec::new(),
            cockpit: ListenerHandle::new(COCKPIT_LISTENER),
            api: ListenerHandle::new(API_LISTENER),
            storage: None,
            started: false,
            span: tracing::info_span!("api-server"),
        })
    }

    /// Register a business route on the API listener.
    pub fn with_endpoint(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_endpoints(mut self, endpoints: impl IntoIterator<Item = Arc<dyn Endpoint>>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Validate requests against `document` instead of the bundled one.
    pub fn with_api_document(mut self, document: Value) -> Self {
        self.document = Some(document);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Storage plugin, once the API listener got far enough to load it.
    pub fn storage(&self) -> Option<&PluginHandle> {
        self.storage.as_ref()
    }

    pub fn cockpit_addr(&self) -> Option<SocketAddr> {
        self.cockpit.local_addr()
    }

    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api.local_addr()
    }

    /// Current state of each listener, cockpit first.
    pub fn listener_states(&self) -> [(&'static str, ListenerState); 2] {
        [
            (self.cockpit.name(), self.cockpit.state()),
            (self.api.name(), self.api.state()),
        ]
    }

    /// Start the cockpit file server, then the API listener.
    ///
    /// On failure every listener that did bind is closed before the error is
    /// returned. A server can only be started once.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        if self.started {
            return Err(StartupError::AlreadyStarted);
        }
        self.started = true;

        let span = self.span.clone();
        let outcome = async {
            self.start_cockpit_file_server().await?;
            self.start_api_server().await?;
            Ok::<(), StartupError>(())
        }
        .instrument(span.clone())
        .await;

        if let Err(e) = &outcome {
            tracing::error!(parent: &span, error = %e, "Startup failed, closing started listeners");
            let report = self.shutdown().await;
            if let Some(close) = report.first_error() {
                tracing::error!(parent: &span, error = %close, "Cleanup after failed startup was incomplete");
            }
        }
        outcome
    }

    async fn start_cockpit_file_server(&mut self) -> Result<SocketAddr, StartupError> {
        let root = match resolve_www_root(&self.config.cockpit_www_root) {
            Ok(root) => root,
            Err(e) => {
                self.cockpit.mark_failed();
                return Err(StartupError::WwwRoot(e));
            }
        };
        tracing::info!(
            www_root = %self.config.cockpit_www_root.display(),
            resolved = %root.display(),
            "Serving cockpit files"
        );

        let addr = self
            .cockpit
            .bind(&self.config.cockpit_host, self.config.cockpit_port, cockpit_router(&root))
            .await
            .map_err(|source| StartupError::Listener {
                listener: COCKPIT_LISTENER,
                source,
            })?;
        tracing::info!(address = %addr, "Cockpit file server listening");
        Ok(addr)
    }

    async fn start_api_server(&mut self) -> Result<SocketAddr, StartupError> {
        let app = match self.compose_api_router().await {
            Ok(app) => app,
            Err(e) => {
                // A plugin or schema failure counts as a bind failure.
                self.api.mark_failed();
                return Err(e);
            }
        };

        let addr = self
            .api
            .bind(&self.config.api_host, self.config.api_port, app)
            .await
            .map_err(|source| StartupError::Listener {
                listener: API_LISTENER,
                source,
            })?;
        tracing::info!(address = %addr, "API server listening");
        Ok(addr)
    }

    async fn compose_api_router(&mut self) -> Result<Router, StartupError> {
        let document = match &self.document {
            Some(document) => document.clone(),
            None => openapi::document().map_err(StartupError::Document)?,
        };
        let cors = CorsPolicy::from_csv(&self.config.api_cors_domain_csv);
        tracing::info!(allow_all = cors.allows_all(), origins = %self.config.api_cors_domain_csv, "CORS policy");

        let builder = ApiRouterBuilder::new()
            .compression()?
            .cors(cors)?
            .json_body(self.config.api_body_limit_bytes)?;

        let validator = RequestValidator::install(document).await?;
        let builder = builder.validation(validator)?.healthcheck()?;

        let storage = self
            .loader
            .load(&self.config.storage_plugin_package, &self.config.storage_plugin_options_json)
            .await?;
        self.storage = Some(storage.clone());

        let app = builder
            .storage(storage, Arc::clone(&self.config))?
            .routes(&self.endpoints)?
            .build()?;
        Ok(app)
    }

    /// Close every bound listener concurrently.
    ///
    /// Never-bound listeners are skipped, so this is a no-op before `start`
    /// and on a second call.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let Self {
            cockpit, api, span, ..
        } = self;
        async move {
            let (cockpit_outcome, api_outcome) = tokio::join!(cockpit.close(), api.close());

            let mut report = ShutdownReport::default();
            report.record(COCKPIT_LISTENER, cockpit_outcome);
            report.record(API_LISTENER, api_outcome);
            tracing::info!(
                closed = report.closed_count(),
                failed = report.failures().len(),
                "Shutdown finished"
            );
            report
        }
        .instrument(span.clone())
        .await
    }
}
