//! BIF API server
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────────┐
//!                  │                    API SERVER                     │
//!                  │                                                   │
//!   Browser        │  ┌──────────┐   ┌─────────────────────────────┐   │
//!   ───────────────┼─▶│ cockpit  │──▶│ static files, index.html    │   │
//!                  │  │ listener │   │ fallback                    │   │
//!                  │  └──────────┘   └─────────────────────────────┘   │
//!                  │                                                   │
//!   API client     │  ┌──────────┐   ┌──────┐   ┌──────┐   ┌───────┐   │
//!   ───────────────┼─▶│   api    │──▶│ CORS │──▶│ JSON │──▶│ valid-│   │
//!                  │  │ listener │   │      │   │ body │   │ ation │   │
//!                  │  └──────────┘   └──────┘   └──────┘   └───┬───┘   │
//!                  │                                            ▼       │
//!                  │                      ┌──────────────────────────┐ │
//!                  │                      │ /healthcheck, consortium │ │
//!                  │                      │ routes ─▶ storage plugin │ │
//!                  │                      └──────────────────────────┘ │
//!                  └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use bif_api_server::lifecycle::{shutdown_signal, ApiServer};
use bif_api_server::observability::{logging, metrics};
use bif_api_server::{consortium, load_config, PluginRegistry};

#[derive(Parser, Debug)]
#[command(name = "bif-api-server", version, about = "Cockpit file server and validated JSON API")]
struct Cli {
    /// TOML config file; environment variables override its keys.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init_logging(&config.log_level).context("failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api_endpoint(),
        cockpit = %config.cockpit_endpoint(),
        plugin = %config.storage_plugin_package,
        "bif-api-server starting"
    );

    if let Some(addr) = &config.metrics_address {
        let addr = addr.parse().context("invalid metrics address")?;
        metrics::init_metrics(addr).context("failed to start metrics exporter")?;
    }

    let mut server = ApiServer::new(config, PluginRegistry::with_builtins())?
        .with_endpoints(consortium::endpoints());

    server.start().await.context("startup failed")?;

    shutdown_signal().await;

    let report = server.shutdown().await;
    for (listener, error) in report.failures() {
        tracing::error!(listener, error = %error, "Listener failed to close");
    }
    let closed = report.into_result().context("shutdown incomplete")?;
    tracing::info!(closed, "Shutdown complete");
    Ok(())
}
