//! Sequential sync over every connected mailbox.
//!
//! Each integration fetches its own batch and runs it through the pipeline.
//! A failing integration is logged and reported; the rest still sync.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gmail::message::message_to_email;
use crate::gmail::MessageSource;
use crate::models::email::EmailRecord;
use crate::models::integration::GmailIntegrationRow;
use crate::pipeline::reconciler::{process_batch, EmailResult, ResultStatus};
use crate::pipeline::store::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationReport {
    pub integration_id: Uuid,
    pub user_id: Uuid,
    pub status: SyncStatus,
    pub fetched: usize,
    pub results: Vec<EmailResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fails only when the integration list itself cannot be read.
pub async fn sync_all(
    store: &dyn JobStore,
    source: &dyn MessageSource,
) -> Result<Vec<IntegrationReport>, AppError> {
    let integrations = store.list_integrations().await?;
    info!("Syncing {} Gmail integrations", integrations.len());

    let mut reports = Vec::with_capacity(integrations.len());
    for integration in &integrations {
        let report = match sync_integration(store, source, integration).await {
            Ok((fetched, results)) => IntegrationReport {
                integration_id: integration.id,
                user_id: integration.user_id,
                status: SyncStatus::Synced,
                fetched,
                results,
                error: None,
            },
            Err(e) => {
                error!(
                    "Gmail sync failed for integration {} ({}): {e}",
                    integration.id, integration.email_address
                );
                IntegrationReport {
                    integration_id: integration.id,
                    user_id: integration.user_id,
                    status: SyncStatus::Error,
                    fetched: 0,
                    results: vec![],
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }
    Ok(reports)
}

async fn sync_integration(
    store: &dyn JobStore,
    source: &dyn MessageSource,
    integration: &GmailIntegrationRow,
) -> Result<(usize, Vec<EmailResult>), AppError> {
    let started_at = Utc::now();
    let messages = source
        .fetch_messages(integration)
        .await
        .map_err(|e| AppError::MailProvider(e.to_string()))?;

    let emails: Vec<EmailRecord> = messages
        .iter()
        .map(|m| message_to_email(m, integration.user_id))
        .collect();
    let results = process_batch(store, &emails).await;

    // `lastSyncedAt` bounds the next fetch, so it only moves once every message
    // has been recorded. Re-fetched successes come back as duplicates.
    let failed = results
        .iter()
        .filter(|r| r.status == ResultStatus::Error)
        .count();
    if failed > 0 {
        warn!(
            "{} of {} messages failed for integration {}, keeping last sync time",
            failed,
            results.len(),
            integration.id
        );
    } else {
        store.mark_synced(integration.id, started_at).await?;
    }
    info!(
        "Synced {} messages for integration {}",
        emails.len(),
        integration.id
    );
    Ok((emails.len(), results))
}

/// Re-runs `sync_all` on a fixed period for the lifetime of the process.
pub fn spawn_scheduler(
    store: Arc<dyn JobStore>,
    source: Arc<dyn MessageSource>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    info!("Gmail sync scheduler running every {}s", period.as_secs());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sync_all(store.as_ref(), source.as_ref()).await {
                error!("Scheduled Gmail sync failed: {e}");
            }
        }
    })
}
