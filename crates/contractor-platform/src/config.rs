use std::time::Duration;

use anyhow::{Context, Result};
use contractor_outbox::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONFIRM_TIMEOUT, DEFAULT_POLL_INTERVAL, PublisherConfig,
};

pub const DEFAULT_CONTRACTOR_STREAM: &str = "contractors.contractor.updated";

/// HTTP gateway settings. The gateway never talks to the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub database_url: String,
    pub http_addr: String,
}

/// Outbox relay settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    pub database_url: String,
    pub redis_url: String,
    pub outbox: OutboxConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboxConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub confirm_timeout: Duration,
    pub stream: String,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            stream: DEFAULT_CONTRACTOR_STREAM.to_string(),
        }
    }
}

impl OutboxConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn publisher(&self) -> PublisherConfig {
        PublisherConfig {
            poll_interval: self.poll_interval,
            batch_size: self.batch_size,
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let poll_interval = match lookup("OUTBOX_POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_positive(&raw, "OUTBOX_POLL_INTERVAL_MS")?),
            None => defaults.poll_interval,
        };
        let batch_size = match lookup("OUTBOX_BATCH_SIZE") {
            Some(raw) => usize::try_from(parse_positive(&raw, "OUTBOX_BATCH_SIZE")?)
                .context("OUTBOX_BATCH_SIZE is too large")?,
            None => defaults.batch_size,
        };
        let confirm_timeout = match lookup("BROKER_CONFIRM_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_positive(&raw, "BROKER_CONFIRM_TIMEOUT_MS")?),
            None => defaults.confirm_timeout,
        };
        let stream = lookup("CONTRACTOR_STREAM").unwrap_or(defaults.stream);

        Ok(Self {
            poll_interval,
            batch_size,
            confirm_timeout,
            stream,
        })
    }
}

fn parse_positive(raw: &str, key: &str) -> Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got {raw:?}"))?;
    if value == 0 {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(value)
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_http_addr)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_http_addr: &str,
    ) -> Result<Self> {
        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL is required")?,
            http_addr: lookup("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string()),
        })
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL is required")?,
            redis_url: lookup("REDIS_URL").context("REDIS_URL is required")?,
            outbox: OutboxConfig::from_lookup(&lookup)?,
        })
    }
}
