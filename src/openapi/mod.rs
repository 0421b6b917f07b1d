//! The declared API contract.
//!
//! The document is bundled at compile time and consumed by the request
//! validator; it declares every route the API listener serves.

use serde_json::Value;

const BIF_API_JSON: &str = include_str!("bif-api.json");

/// Parse the bundled OpenAPI document.
pub fn document() -> Result<Value, serde_json::Error> {
    serde_json::from_str(BIF_API_JSON)
}
