//! Extractor — best-effort structured hints from unstructured email text.
//!
//! Every function is pure. `None` means "not found" and is never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::email::EmailRecord;

static POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bregarding|\bre:|\bfor)\s+(.+?)\s+(?:position|role|opportunity|opening)\b")
        .expect("position pattern is valid")
});

static REFERENCE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:application|job|requisition|reference)[ \t]*(?:id|number|code)?[ \t]*:[ \t]*([a-z0-9-]+)")
        .expect("reference id pattern is valid")
});

/// Hints pulled out of a single email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub job_reference_id: Option<String>,
}

pub fn extract(email: &EmailRecord) -> ExtractedFields {
    ExtractedFields {
        company_name: extract_company_name(&email.sender, &email.content),
        position: extract_position(&email.subject, &email.content),
        job_reference_id: extract_job_reference_id(&email.content),
    }
}

/// Domain label of the sender address, first letter upper-cased.
///
/// `"HR Team <hr@acme.com>"` → `"Acme"`. Purely syntactic: a personal
/// `@gmail.com` sender yields `"Gmail"`.
pub fn extract_company_name(sender: &str, _content: &str) -> Option<String> {
    let (_, domain) = sender.split_once('@')?;
    let label: &str = domain
        .split(|c: char| c == '.' || c == '>' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    let mut chars = label.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Title between "regarding / re: / for" and "position / role / opportunity / opening"
/// in the subject line.
pub fn extract_position(subject: &str, _content: &str) -> Option<String> {
    POSITION_RE
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Id following "Application / Job / Requisition / Reference [ID|Number|Code]:" in the body.
pub fn extract_job_reference_id(content: &str) -> Option<String> {
    REFERENCE_ID_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
