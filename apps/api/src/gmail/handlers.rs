use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::gmail::sync::{sync_all, IntegrationReport};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub integrations: Vec<IntegrationReport>,
}

/// POST /api/v1/gmail/sync
pub async fn handle_sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, AppError> {
    let integrations = sync_all(state.store.as_ref(), state.gmail.as_ref()).await?;
    Ok(Json(SyncResponse {
        success: true,
        integrations,
    }))
}
