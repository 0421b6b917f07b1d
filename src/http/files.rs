//! Static file server for the cockpit single-page app.
//!
//! Existing files are served as-is; every other path falls back to
//! `index.html` so the SPA's client-side router can take over.

use std::io;
use std::path::{Path, PathBuf};

use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub const INDEX_FILE: &str = "index.html";

/// Resolve `configured` against the working directory.
pub fn resolve_www_root(configured: &Path) -> io::Result<PathBuf> {
    Ok(std::env::current_dir()?.join(configured))
}

/// Build the cockpit router rooted at `www_root`.
pub fn cockpit_router(www_root: &Path) -> Router {
    let index = www_root.join(INDEX_FILE);
    if !index.is_file() {
        tracing::warn!(path = %index.display(), "Cockpit index file is missing");
    }

    Router::new()
        .fallback_service(ServeDir::new(www_root).fallback(ServeFile::new(index)))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
