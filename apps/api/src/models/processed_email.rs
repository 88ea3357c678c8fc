use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::pipeline::classifier::Category;

/// Append-only audit row, one per processed email. Unique on (user_id, email_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcessedEmailRow {
    pub id: Uuid,
    pub email_id: String,
    pub user_id: Uuid,
    pub subject: String,
    pub sender: String,
    pub received_at: DateTime<Utc>,
    pub content: String,
    pub category: Category,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub job_reference_id: Option<String>,
    pub job_id: Option<Uuid>,
    pub processed_at: DateTime<Utc>,
}
