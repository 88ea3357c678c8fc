//! Axum route handlers for the email pipeline.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::email::EmailRecord;
use crate::models::processed_email::ProcessedEmailRow;
use crate::pipeline::reconciler::{process_batch, EmailResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProcessEmailsResponse {
    pub success: bool,
    pub results: Vec<EmailResult>,
}

const DEFAULT_PROCESSED_LIMIT: i64 = 50;
const MAX_PROCESSED_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct ListProcessedQuery {
    pub user_id: Uuid,
    pub limit: Option<i64>,
}

/// POST /api/v1/emails/process
///
/// Body: `{ "emails": [EmailRecord, ...] }`. The whole batch is rejected with
/// 400 before any processing if it is not well formed.
pub async fn handle_process_emails(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ProcessEmailsResponse>, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let emails = parse_batch(body)?;
    info!("Processing batch of {} emails", emails.len());

    let results = process_batch(state.store.as_ref(), &emails).await;

    Ok(Json(ProcessEmailsResponse {
        success: true,
        results,
    }))
}

/// GET /api/v1/emails/processed?user_id=&limit=
///
/// The user's audit log, newest first. `limit` defaults to 50 and is clamped to 1..=500.
pub async fn handle_list_processed(
    State(state): State<AppState>,
    params: Result<Query<ListProcessedQuery>, QueryRejection>,
) -> Result<Json<Vec<ProcessedEmailRow>>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PROCESSED_LIMIT)
        .clamp(1, MAX_PROCESSED_LIMIT);
    let rows = state.store.list_processed(params.user_id, limit).await?;
    Ok(Json(rows))
}

fn parse_batch(mut body: Value) -> Result<Vec<EmailRecord>, AppError> {
    let items = match body.get_mut("emails").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => return Err(AppError::Validation("emails must be an array".to_string())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<EmailRecord>(item)
                .map_err(|e| AppError::Validation(format!("emails[{i}] is malformed: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_batch_rejects_missing_emails() {
        assert!(matches!(
            parse_batch(json!({})),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_batch_rejects_non_array() {
        assert!(matches!(
            parse_batch(json!({"emails": {"emailId": "1"}})),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_batch_names_the_bad_item() {
        let body = json!({"emails": [
            {
                "emailId": "1",
                "subject": "s",
                "sender": "a@b.com",
                "receivedAt": "2024-03-01T09:30:00Z",
                "content": "c",
                "userId": "6f1c1a3e-9a43-4c1b-8f0e-2d5b1f0f7a11"
            },
            {"emailId": "2"}
        ]});
        match parse_batch(body) {
            Err(AppError::Validation(msg)) => assert!(msg.starts_with("emails[1]")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_batch_accepts_empty_array() {
        assert!(parse_batch(json!({"emails": []})).unwrap().is_empty());
    }
}
