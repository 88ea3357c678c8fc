//! Reconciler — matches each email to at most one application, applies the
//! category-implied status transition and writes one audit log entry.
//!
//! Emails are processed strictly in input order, one at a time. A failure on
//! one email is captured in its result and never aborts the batch.

use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::email::EmailRecord;
use crate::models::job_application::{JobApplicationRow, JobStatus};
use crate::pipeline::classifier::{classify, Category};
use crate::pipeline::extractor::{extract, ExtractedFields};
use crate::pipeline::store::{JobStore, NewProcessedEmail, StatusUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Matched,
    Unmatched,
    /// Already logged by an earlier run; nothing was written.
    Duplicate,
    Error,
}

/// Outcome of the status transition for a matched application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Updated(JobStatus),
    Unchanged,
}

impl Serialize for StatusChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusChange::Updated(status) => serializer.serialize_str(status.as_str()),
            StatusChange::Unchanged => serializer.serialize_str("unchanged"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResult {
    pub email_id: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<StatusChange>,
    pub category: Category,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub job_reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailResult {
    fn new(email: &EmailRecord, fields: ExtractedFields, category: Category) -> Self {
        Self {
            email_id: email.email_id.clone(),
            status: ResultStatus::Unmatched,
            matched_job_id: None,
            new_status: None,
            category,
            company_name: fields.company_name,
            position: fields.position,
            job_reference_id: fields.job_reference_id,
            error: None,
        }
    }
}

/// Runs every email through extract → classify → reconcile, in order.
/// The output has the same length and order as `emails`.
pub async fn process_batch(store: &dyn JobStore, emails: &[EmailRecord]) -> Vec<EmailResult> {
    let mut results = Vec::with_capacity(emails.len());
    for email in emails {
        results.push(process_email(store, email).await);
    }

    let count = |s: ResultStatus| results.iter().filter(|r| r.status == s).count();
    info!(
        "Processed {} emails: {} matched, {} unmatched, {} duplicate, {} errors",
        results.len(),
        count(ResultStatus::Matched),
        count(ResultStatus::Unmatched),
        count(ResultStatus::Duplicate),
        count(ResultStatus::Error),
    );
    results
}

pub async fn process_email(store: &dyn JobStore, email: &EmailRecord) -> EmailResult {
    let fields = extract(email);
    let category = classify(&email.subject, &email.content);
    let mut result = EmailResult::new(email, fields, category);

    if let Err(e) = reconcile(store, email, &mut result).await {
        warn!("Failed to process email {}: {e}", email.email_id);
        result.status = ResultStatus::Error;
        result.matched_job_id = None;
        result.new_status = None;
        result.error = Some(e.to_string());
    }
    result
}

async fn reconcile(
    store: &dyn JobStore,
    email: &EmailRecord,
    result: &mut EmailResult,
) -> Result<(), AppError> {
    if let Some(previous) = store.find_processed(email.user_id, &email.email_id).await? {
        debug!("Email {} already processed, skipping", email.email_id);
        result.status = ResultStatus::Duplicate;
        result.category = previous.category;
        result.company_name = previous.company_name;
        result.position = previous.position;
        result.job_reference_id = previous.job_reference_id;
        result.matched_job_id = previous.job_id;
        return Ok(());
    }

    let matched = find_matching_job(store, email.user_id, result).await?;

    let update = matched.as_ref().and_then(|job| {
        let target = result.category.implied_status()?;
        if target == job.status {
            result.new_status = Some(StatusChange::Unchanged);
            None
        } else {
            Some(StatusUpdate {
                job_id: job.id,
                user_id: job.user_id,
                status: target,
            })
        }
    });
    let applied = update.as_ref().map(|u| u.status);

    let log = NewProcessedEmail {
        email_id: email.email_id.clone(),
        user_id: email.user_id,
        subject: email.subject.clone(),
        sender: email.sender.clone(),
        received_at: email.received_at,
        content: email.content.clone(),
        category: result.category,
        company_name: result.company_name.clone(),
        position: result.position.clone(),
        job_reference_id: result.job_reference_id.clone(),
        job_id: matched.as_ref().map(|job| job.id),
    };
    store.record_outcome(update, log).await?;

    match matched {
        Some(job) => {
            if let Some(status) = applied {
                info!(
                    "Job {} moved {} -> {} by email {}",
                    job.id,
                    job.status.as_str(),
                    status.as_str(),
                    email.email_id
                );
                result.new_status = Some(StatusChange::Updated(status));
            }
            result.status = ResultStatus::Matched;
            result.matched_job_id = Some(job.id);
        }
        None => {
            debug!("Email {} did not match any application", email.email_id);
            result.status = ResultStatus::Unmatched;
        }
    }
    Ok(())
}

/// Reference id first; company + position only when no reference id was found.
async fn find_matching_job(
    store: &dyn JobStore,
    user_id: Uuid,
    result: &EmailResult,
) -> Result<Option<JobApplicationRow>, AppError> {
    if let Some(reference) = &result.job_reference_id {
        return store.find_by_reference(user_id, reference).await;
    }
    match (&result.company_name, &result.position) {
        (Some(company), Some(position)) => {
            store
                .find_by_company_position(user_id, company, position)
                .await
        }
        _ => Ok(None),
    }
}
