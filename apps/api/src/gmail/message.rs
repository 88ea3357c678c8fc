use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::email::EmailRecord;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    /// Present while more results remain.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
}

/// A message fetched with `format=metadata`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: String,
    /// Epoch milliseconds, as a decimal string.
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl GmailMessage {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn received_at(&self) -> Option<DateTime<Utc>> {
        if let Some(ms) = self.internal_date.as_deref().and_then(|s| s.parse::<i64>().ok()) {
            if let Some(at) = Utc.timestamp_millis_opt(ms).single() {
                return Some(at);
            }
        }
        self.header("Date").and_then(parse_date_header)
    }
}

/// RFC 2822 date, tolerating a trailing zone comment such as "(UTC)".
fn parse_date_header(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = match raw.find(" (") {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    DateTime::parse_from_rfc2822(trimmed.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Content is the snippet; the full body is never parsed.
pub fn message_to_email(message: &GmailMessage, user_id: Uuid) -> EmailRecord {
    EmailRecord {
        email_id: message.id.clone(),
        subject: message.header("Subject").unwrap_or_default().to_string(),
        sender: message.header("From").unwrap_or_default().to_string(),
        received_at: message.received_at().unwrap_or_else(Utc::now),
        content: message.snippet.clone(),
        user_id,
    }
}
