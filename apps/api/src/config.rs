use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Resolved once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub gmail_api_base: String,
    pub gmail_query: String,
    pub gmail_max_results: u32,
    /// Background Gmail sync period. `None` disables the scheduler.
    pub gmail_sync_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gmail_api_base: std::env::var("GMAIL_API_BASE")
                .unwrap_or_else(|_| "https://gmail.googleapis.com".to_string()),
            gmail_query: std::env::var("GMAIL_QUERY").unwrap_or_else(|_| "in:inbox".to_string()),
            gmail_max_results: std::env::var("GMAIL_MAX_RESULTS")
                .unwrap_or_else(|_| "25".to_string())
                .parse::<u32>()
                .context("GMAIL_MAX_RESULTS must be a positive integer")?,
            gmail_sync_interval: parse_interval(std::env::var("GMAIL_SYNC_INTERVAL_SECS").ok())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset, empty or zero disables the interval.
fn parse_interval(raw: Option<String>) -> Result<Option<Duration>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .context("GMAIL_SYNC_INTERVAL_SECS must be a number of seconds")?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
