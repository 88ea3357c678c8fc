use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One inbound email, normalized. Arrives from the client or from a mail
/// provider sync and is never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    /// Externally assigned id (the provider's message id).
    pub email_id: String,
    pub subject: String,
    /// "Name <addr>" or a bare address.
    pub sender: String,
    pub received_at: DateTime<Utc>,
    /// Plain-text body or provider snippet.
    pub content: String,
    pub user_id: Uuid,
}
