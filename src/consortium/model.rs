use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const KEY_PREFIX: &str = "consortium/";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsortiumRequestV1 {
    pub consortium_name: String,
    pub organization_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsortiumV1 {
    pub id: String,
    pub consortium_name: String,
    pub organization_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub created_at: String,
}

impl ConsortiumV1 {
    /// A new consortium with a fresh id.
    pub fn create(request: CreateConsortiumRequestV1, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            consortium_name: request.consortium_name,
            organization_name: request.organization_name,
            base_url: request.base_url,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn storage_key(&self) -> String {
        storage_key(&self.id)
    }
}

/// Storage key of the consortium with `id`.
pub fn storage_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}
