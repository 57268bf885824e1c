use std::sync::Arc;

use anyhow::{Context, Result};
use contractor_core::SystemClock;
use contractor_outbox::{DispatchClient, OutboxPublisher};
use contractor_platform::{PgOutboxStore, RedisBus, RelayConfig, connect_database};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "contractor_relay=info,contractor_outbox=info".to_string()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let pool = connect_database(&config.database_url).await?;
    let bus = RedisBus::connect(&config.redis_url, config.outbox.stream.clone())?;

    let publisher = OutboxPublisher::new(
        Arc::new(PgOutboxStore::new(pool)),
        DispatchClient::new(Arc::new(bus), config.outbox.confirm_timeout),
        Arc::new(SystemClock),
        config.outbox.publisher(),
    );

    info!(
        stream = %config.outbox.stream,
        poll_interval_ms = config.outbox.poll_interval.as_millis() as u64,
        batch_size = config.outbox.batch_size,
        "outbox relay started"
    );
    let handle = publisher.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutdown requested, waiting for the current cycle");
    let stats = handle
        .shutdown()
        .await
        .context("outbox publisher task panicked")?;
    info!(
        cycles = stats.cycles,
        failed_cycles = stats.failed_cycles,
        published = stats.published,
        failed = stats.failed,
        mark_failed = stats.mark_failed,
        "outbox relay stopped"
    );

    Ok(())
}
