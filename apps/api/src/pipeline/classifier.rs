//! Classifier — ordered keyword decision list over subject + body.
//!
//! Rules are evaluated top to bottom and the first hit wins. Interview is
//! checked before rejected, so a snippet carrying both an invitation and a
//! rejection is labelled `Interview`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::job_application::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "email_category", rename_all = "snake_case")]
pub enum Category {
    Interview,
    Rejected,
    Offer,
    ApplicationConfirmation,
    Other,
}

impl Category {
    /// Status a matched application moves to, if any.
    pub fn implied_status(&self) -> Option<JobStatus> {
        match self {
            Category::Interview => Some(JobStatus::Interview),
            Category::Rejected => Some(JobStatus::Rejected),
            Category::Offer => Some(JobStatus::Offer),
            Category::ApplicationConfirmation | Category::Other => None,
        }
    }
}

static RULES: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    [
        (
            Category::Interview,
            r"interview|schedule|next steps|zoom|meet|calendar|discuss your application",
        ),
        (
            Category::Rejected,
            r"regret to inform|not selected|another candidate|moved forward with other applicants|not moving forward|position has been filled",
        ),
        (
            Category::Offer,
            r"job offer|pleased to offer|congratulations on|formal offer|offer letter",
        ),
        (
            Category::ApplicationConfirmation,
            r"application.*received|thank you for applying|application.*confirmation|successfully.*submitted",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| {
        (
            category,
            Regex::new(pattern).expect("classifier pattern is valid"),
        )
    })
    .collect()
});

pub fn classify(subject: &str, content: &str) -> Category {
    let text = format!("{subject} {content}").to_lowercase();
    RULES
        .iter()
        .find(|(_, re)| re.is_match(&text))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
