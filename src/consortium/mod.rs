//! Consortium business routes, persisted through the storage plugin.

pub mod handlers;
pub mod model;

use std::sync::Arc;

pub use handlers::{ConsortiumError, CreateConsortiumEndpoint, GetConsortiumEndpoint};
pub use model::{ConsortiumV1, CreateConsortiumRequestV1};

pub use crate::http::Endpoint;

/// Every consortium endpoint, ready for [`crate::http::ApiRouterBuilder::routes`].
pub fn endpoints() -> Vec<Arc<dyn Endpoint>> {
    vec![Arc::new(CreateConsortiumEndpoint), Arc::new(GetConsortiumEndpoint)]
}
