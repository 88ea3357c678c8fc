use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A connected Gmail mailbox.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GmailIntegrationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email_address: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
