//! In-memory doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gmail::message::{GmailMessage, Header, MessagePayload};
use crate::gmail::{GmailError, MessageSource};
use crate::models::email::EmailRecord;
use crate::models::integration::GmailIntegrationRow;
use crate::models::job_application::{JobApplicationRow, JobStatus};
use crate::models::processed_email::ProcessedEmailRow;
use crate::pipeline::store::{JobStore, NewProcessedEmail, StatusUpdate};

pub fn email(id: &str, user_id: Uuid, subject: &str, sender: &str, content: &str) -> EmailRecord {
    EmailRecord {
        email_id: id.to_string(),
        subject: subject.to_string(),
        sender: sender.to_string(),
        received_at: Utc::now(),
        content: content.to_string(),
        user_id,
    }
}

pub fn job(
    user_id: Uuid,
    company: &str,
    position: &str,
    status: JobStatus,
    reference: Option<&str>,
) -> JobApplicationRow {
    let now = Utc::now();
    JobApplicationRow {
        id: Uuid::new_v4(),
        user_id,
        company: company.to_string(),
        position: position.to_string(),
        status,
        job_reference_id: reference.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

pub fn integration(user_id: Uuid) -> GmailIntegrationRow {
    GmailIntegrationRow {
        id: Uuid::new_v4(),
        user_id,
        email_address: format!("{user_id}@example.com"),
        access_token: "test-token".to_string(),
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

pub fn gmail_message(id: &str, subject: &str, from: &str, snippet: &str) -> GmailMessage {
    GmailMessage {
        id: id.to_string(),
        snippet: snippet.to_string(),
        internal_date: Some(Utc::now().timestamp_millis().to_string()),
        payload: Some(MessagePayload {
            headers: vec![
                Header {
                    name: "Subject".to_string(),
                    value: subject.to_string(),
                },
                Header {
                    name: "From".to_string(),
                    value: from.to_string(),
                },
            ],
        }),
    }
}

/// `JobStore` over vectors, recording every call by name.
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Vec<JobApplicationRow>>,
    logs: Mutex<Vec<ProcessedEmailRow>>,
    integrations: Mutex<Vec<GmailIntegrationRow>>,
    calls: Mutex<Vec<String>>,
    failing_references: Mutex<Vec<String>>,
    fail_logs: AtomicBool,
}

impl MemoryStore {
    pub fn insert_job(&self, job: JobApplicationRow) {
        self.jobs.lock().unwrap().push(job);
    }

    pub fn insert_integration(&self, integration: GmailIntegrationRow) {
        self.integrations.lock().unwrap().push(integration);
    }

    pub fn job(&self, id: Uuid) -> Option<JobApplicationRow> {
        self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned()
    }

    pub fn integration(&self, id: Uuid) -> Option<GmailIntegrationRow> {
        self.integrations
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn logs(&self) -> Vec<ProcessedEmailRow> {
        self.logs.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Lookups by this reference id fail with a database error.
    pub fn fail_reference(&self, reference: &str) {
        self.failing_references
            .lock()
            .unwrap()
            .push(reference.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_references.lock().unwrap().clear();
        self.fail_logs.store(false, Ordering::SeqCst);
    }

    pub fn fail_log_writes(&self) {
        self.fail_logs.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_processed(
        &self,
        user_id: Uuid,
        email_id: &str,
    ) -> Result<Option<ProcessedEmailRow>, AppError> {
        self.record("find_processed");
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.user_id == user_id && l.email_id == email_id)
            .cloned())
    }

    async fn find_by_reference(
        &self,
        user_id: Uuid,
        job_reference_id: &str,
    ) -> Result<Option<JobApplicationRow>, AppError> {
        self.record("find_by_reference");
        if self
            .failing_references
            .lock()
            .unwrap()
            .iter()
            .any(|r| r == job_reference_id)
        {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| {
                j.user_id == user_id && j.job_reference_id.as_deref() == Some(job_reference_id)
            })
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn find_by_company_position(
        &self,
        user_id: Uuid,
        company: &str,
        position: &str,
    ) -> Result<Option<JobApplicationRow>, AppError> {
        self.record("find_by_company_position");
        let company = company.to_lowercase();
        let position = position.to_lowercase();
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| {
                j.user_id == user_id
                    && j.company.to_lowercase().contains(&company)
                    && j.position.to_lowercase().contains(&position)
            })
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn record_outcome(
        &self,
        update: Option<StatusUpdate>,
        log: NewProcessedEmail,
    ) -> Result<(), AppError> {
        self.record("record_outcome");
        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }

        if let Some(update) = update {
            self.record("update_status");
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs
                .iter_mut()
                .find(|j| j.id == update.job_id && j.user_id == update.user_id)
            {
                job.status = update.status;
                job.updated_at = Utc::now();
            }
        }

        self.logs.lock().unwrap().push(ProcessedEmailRow {
            id: Uuid::new_v4(),
            email_id: log.email_id,
            user_id: log.user_id,
            subject: log.subject,
            sender: log.sender,
            received_at: log.received_at,
            content: log.content,
            category: log.category,
            company_name: log.company_name,
            position: log.position,
            job_reference_id: log.job_reference_id,
            job_id: log.job_id,
            processed_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_processed(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ProcessedEmailRow>, AppError> {
        self.record("list_processed");
        // Insertion order breaks processed_at ties, latest first.
        let mut rows: Vec<ProcessedEmailRow> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn list_integrations(&self) -> Result<Vec<GmailIntegrationRow>, AppError> {
        self.record("list_integrations");
        Ok(self.integrations.lock().unwrap().clone())
    }

    async fn mark_synced(&self, integration_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.record("mark_synced");
        if let Some(integration) = self
            .integrations
            .lock()
            .unwrap()
            .iter_mut()
            .find(|i| i.id == integration_id)
        {
            integration.last_synced_at = Some(at);
        }
        Ok(())
    }
}

/// `MessageSource` with canned messages or failures per integration.
#[derive(Default)]
pub struct StaticSource {
    responses: Mutex<HashMap<Uuid, Result<Vec<GmailMessage>, u16>>>,
}

impl StaticSource {
    pub fn set_messages(&self, integration_id: Uuid, messages: Vec<GmailMessage>) {
        self.responses
            .lock()
            .unwrap()
            .insert(integration_id, Ok(messages));
    }

    pub fn set_failure(&self, integration_id: Uuid, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(integration_id, Err(status));
    }
}

#[async_trait]
impl MessageSource for StaticSource {
    async fn fetch_messages(
        &self,
        integration: &GmailIntegrationRow,
    ) -> Result<Vec<GmailMessage>, GmailError> {
        match self.responses.lock().unwrap().get(&integration.id) {
            Some(Ok(messages)) => Ok(messages.clone()),
            Some(Err(status)) => Err(GmailError::Api {
                status: *status,
                message: "unauthorized".to_string(),
            }),
            None => Ok(vec![]),
        }
    }
}
