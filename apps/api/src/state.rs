use std::sync::Arc;

use crate::gmail::MessageSource;
use crate::pipeline::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline persistence. Default: `PgJobStore` over the Postgres pool.
    pub store: Arc<dyn JobStore>,
    /// Mail provider used by the sync path. Default: `GmailClient`.
    pub gmail: Arc<dyn MessageSource>,
}
