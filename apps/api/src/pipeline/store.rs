//! Persistence seam for the pipeline.
//!
//! `AppState` holds an `Arc<dyn JobStore>`; Postgres in production, an
//! in-memory double in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::integration::GmailIntegrationRow;
use crate::models::job_application::{JobApplicationRow, JobStatus};
use crate::models::processed_email::ProcessedEmailRow;
use crate::pipeline::classifier::Category;

/// Status write for a matched application.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub status: JobStatus,
}

/// Log entry written once per processed email.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProcessedEmail {
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
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_processed(
        &self,
        user_id: Uuid,
        email_id: &str,
    ) -> Result<Option<ProcessedEmailRow>, AppError>;

    /// Exact (user_id, job_reference_id) match.
    async fn find_by_reference(
        &self,
        user_id: Uuid,
        job_reference_id: &str,
    ) -> Result<Option<JobApplicationRow>, AppError>;

    /// Case-insensitive substring match on company and position together.
    /// When several rows match, the most recently created one is returned.
    async fn find_by_company_position(
        &self,
        user_id: Uuid,
        company: &str,
        position: &str,
    ) -> Result<Option<JobApplicationRow>, AppError>;

    /// Applies the optional status update and appends the log entry atomically.
    async fn record_outcome(
        &self,
        update: Option<StatusUpdate>,
        log: NewProcessedEmail,
    ) -> Result<(), AppError>;

    /// The user's log entries, newest first, at most `limit` of them.
    async fn list_processed(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ProcessedEmailRow>, AppError>;

    async fn list_integrations(&self) -> Result<Vec<GmailIntegrationRow>, AppError>;

    async fn mark_synced(&self, integration_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}

/// Wraps a value in `%...%` with LIKE metacharacters escaped.
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_processed(
        &self,
        user_id: Uuid,
        email_id: &str,
    ) -> Result<Option<ProcessedEmailRow>, AppError> {
        let row = sqlx::query_as::<_, ProcessedEmailRow>(
            "SELECT * FROM processed_emails WHERE user_id = $1 AND email_id = $2",
        )
        .bind(user_id)
        .bind(email_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_reference(
        &self,
        user_id: Uuid,
        job_reference_id: &str,
    ) -> Result<Option<JobApplicationRow>, AppError> {
        let row = sqlx::query_as::<_, JobApplicationRow>(
            r#"
            SELECT * FROM job_applications
            WHERE user_id = $1 AND job_reference_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(job_reference_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_company_position(
        &self,
        user_id: Uuid,
        company: &str,
        position: &str,
    ) -> Result<Option<JobApplicationRow>, AppError> {
        let row = sqlx::query_as::<_, JobApplicationRow>(
            r#"
            SELECT * FROM job_applications
            WHERE user_id = $1
              AND company ILIKE $2 ESCAPE '\'
              AND position ILIKE $3 ESCAPE '\'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(contains_pattern(company))
        .bind(contains_pattern(position))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_outcome(
        &self,
        update: Option<StatusUpdate>,
        log: NewProcessedEmail,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(update) = &update {
            sqlx::query(
                "UPDATE job_applications SET status = $1, updated_at = now() WHERE id = $2 AND user_id = $3",
            )
            .bind(update.status)
            .bind(update.job_id)
            .bind(update.user_id)
            .execute(&mut *tx)
            .await?;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO processed_emails
                (email_id, user_id, subject, sender, received_at, content,
                 category, company_name, position, job_reference_id, job_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, email_id) DO NOTHING
            "#,
        )
        .bind(&log.email_id)
        .bind(log.user_id)
        .bind(&log.subject)
        .bind(&log.sender)
        .bind(log.received_at)
        .bind(&log.content)
        .bind(log.category)
        .bind(&log.company_name)
        .bind(&log.position)
        .bind(&log.job_reference_id)
        .bind(log.job_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // Dropping the transaction rolls back the status update.
            return Err(AppError::Conflict(format!(
                "Email {} was already processed",
                log.email_id
            )));
        }

        tx.commit().await?;
        debug!(
            "Recorded email {} for user {} (job: {:?})",
            log.email_id, log.user_id, log.job_id
        );
        Ok(())
    }

    async fn list_processed(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ProcessedEmailRow>, AppError> {
        let rows = sqlx::query_as::<_, ProcessedEmailRow>(
            r#"
            SELECT * FROM processed_emails
            WHERE user_id = $1
            ORDER BY processed_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_integrations(&self) -> Result<Vec<GmailIntegrationRow>, AppError> {
        let rows = sqlx::query_as::<_, GmailIntegrationRow>(
            "SELECT * FROM gmail_integrations ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_synced(&self, integration_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE gmail_integrations SET last_synced_at = $1 WHERE id = $2")
            .bind(at)
            .bind(integration_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
