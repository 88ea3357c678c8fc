//! Gmail client — fetches recent message metadata for a connected mailbox.
//!
//! Only the snippet and the Subject/From/Date headers are requested; bodies
//! are never downloaded. Token refresh is left to whoever writes the
//! integration row, so an expired token fails that integration's sync.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::integration::GmailIntegrationRow;

pub mod handlers;
pub mod message;
pub mod sync;

use message::{GmailMessage, MessageList};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Anything that can hand back recent messages for an integration.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_messages(
        &self,
        integration: &GmailIntegrationRow,
    ) -> Result<Vec<GmailMessage>, GmailError>;
}

#[derive(Clone)]
pub struct GmailClient {
    client: Client,
    api_base: String,
    query: String,
    max_results: u32,
}

impl GmailClient {
    pub fn new(config: &Config) -> Result<Self, GmailError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_base: config.gmail_api_base.trim_end_matches('/').to_string(),
            query: config.gmail_query.clone(),
            max_results: config.gmail_max_results,
        })
    }

    /// Search query, narrowed to mail newer than the last sync.
    fn search_query(&self, integration: &GmailIntegrationRow) -> String {
        match integration.last_synced_at {
            Some(at) => format!("{} after:{}", self.query, at.timestamp()),
            None => self.query.clone(),
        }
    }

    /// Sends the request, retrying transport errors, 429 and 5xx with exponential
    /// backoff. After the last attempt the last failure is returned.
    async fn get_json<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, GmailError> {
        let mut attempt = 0;
        loop {
            let error = match build().send().await {
                Err(e) => GmailError::Http(e),
                Ok(response) => {
                    let status = response.status();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if status.is_success() {
                        return Ok(response.json::<T>().await?);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let error = GmailError::Api {
                        status: status.as_u16(),
                        message: body,
                    };
                    if !retryable {
                        return Err(error);
                    }
                    error
                }
            };

            attempt += 1;
            if attempt >= MAX_RETRIES {
                return Err(error);
            }

            // 1s, 2s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "Gmail request attempt {} failed ({error}), retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Ids of every message matching the query, following `nextPageToken`.
    async fn list_message_ids(
        &self,
        integration: &GmailIntegrationRow,
    ) -> Result<Vec<String>, GmailError> {
        let token = &integration.access_token;
        let list_url = format!("{}/gmail/v1/users/me/messages", self.api_base);
        let query = self.search_query(integration);
        let max_results = self.max_results.to_string();

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page: MessageList = {
                let mut params = vec![("q", query.as_str()), ("maxResults", max_results.as_str())];
                if let Some(next) = page_token.as_deref() {
                    params.push(("pageToken", next));
                }
                self.get_json(|| self.client.get(&list_url).bearer_auth(token).query(&params))
                    .await?
            };
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl MessageSource for GmailClient {
    async fn fetch_messages(
        &self,
        integration: &GmailIntegrationRow,
    ) -> Result<Vec<GmailMessage>, GmailError> {
        let ids = self.list_message_ids(integration).await?;
        debug!("Listed {} messages for {}", ids.len(), integration.email_address);

        let token = &integration.access_token;
        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            let url = format!("{}/gmail/v1/users/me/messages/{id}", self.api_base);
            let message: GmailMessage = self
                .get_json(|| {
                    self.client.get(&url).bearer_auth(token).query(&[
                        ("format", "metadata"),
                        ("metadataHeaders", "Subject"),
                        ("metadataHeaders", "From"),
                        ("metadataHeaders", "Date"),
                    ])
                })
                .await?;
            messages.push(message);
        }
        Ok(messages)
    }
}
