pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::gmail::handlers as gmail_handlers;
use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Email pipeline
        .route("/api/v1/emails/process", post(handlers::handle_process_emails))
        .route(
            "/api/v1/emails/processed",
            get(handlers::handle_list_processed),
        )
        // Gmail sync
        .route("/api/v1/gmail/sync", post(gmail_handlers::handle_sync))
        .with_state(state)
}
