//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::Path;

use bif_api_server::config::schema::DEFAULT_BODY_LIMIT_BYTES;
use bif_api_server::{consortium, ApiServer, PluginRegistry, ServerConfig};
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<!doctype html><title>cockpit</title>";
pub const APP_JS: &str = "console.log('cockpit');";
pub const COCKPIT_ORIGIN: &str = "http://cockpit.test";

/// Document root holding an index page and one asset.
pub fn www_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/app.js"), APP_JS).unwrap();
    dir
}

/// Config with both listeners on ephemeral loopback ports.
pub fn config(www: &Path, cors_csv: &str) -> ServerConfig {
    ServerConfig {
        api_host: "127.0.0.1".into(),
        api_port: 0,
        cockpit_host: "127.0.0.1".into(),
        cockpit_port: 0,
        cockpit_www_root: www.to_path_buf(),
        api_cors_domain_csv: cors_csv.into(),
        storage_plugin_package: "bif-plugin-kv-storage-memory".into(),
        storage_plugin_options_json: "{}".into(),
        log_level: "debug".into(),
        api_body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        metrics_address: None,
    }
}

pub fn server(config: ServerConfig) -> ApiServer {
    ApiServer::new(config, PluginRegistry::with_builtins())
        .unwrap()
        .with_endpoints(consortium::endpoints())
}

/// Started server plus the document root it serves.
pub async fn started(cors_csv: &str) -> (ApiServer, TempDir) {
    let www = www_root();
    let mut server = server(config(www.path(), cors_csv));
    server.start().await.unwrap();
    (server, www)
}

pub fn api_url(server: &ApiServer, path: &str) -> String {
    format!("http://{}{}", server.api_addr().unwrap(), path)
}

pub fn cockpit_url(server: &ApiServer, path: &str) -> String {
    format!("http://{}{}", server.cockpit_addr().unwrap(), path)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
