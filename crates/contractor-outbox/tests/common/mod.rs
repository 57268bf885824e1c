//! Shared harness for outbox pipeline tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use contractor_core::{Clock, ContractorChange, EventType, OutboxEvent};
use contractor_outbox::{
    DEFAULT_BATCH_SIZE, DispatchClient, InMemoryOutboxStore, OutboxError, OutboxPublisher,
    OutboxWriter, PublisherConfig,
};
use contractor_test_support::{ScriptedBroker, SteppingClock};

/// An in-memory outbox with a writer and a clock that ticks one second per
/// read, so rows get distinct, increasing `created_at` values.
pub struct Harness {
    pub store: InMemoryOutboxStore,
    pub clock: Arc<SteppingClock>,
    pub writer: OutboxWriter,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            chrono::Duration::seconds(1),
        ));
        Self {
            store: InMemoryOutboxStore::new(),
            writer: OutboxWriter::new(clock.clone()),
            clock,
        }
    }

    pub fn change(&self, contractor_id: &str) -> ContractorChange {
        ContractorChange {
            id: contractor_id.to_string(),
            name: format!("Contractor {contractor_id}"),
            inn: Some("7702165310".to_string()),
            modify_date_time: self.clock.now(),
        }
    }

    /// Mimics the domain write path: the contractor write and the outbox
    /// append share one transaction, and a failing domain write rolls both
    /// back.
    pub async fn save_contractor(
        &self,
        contractor_id: &str,
        domain_write_fails: bool,
    ) -> Result<OutboxEvent, String> {
        let mut tx = self.store.begin();
        let event = self
            .writer
            .append(&mut tx, EventType::ContractorUpdated, &self.change(contractor_id))
            .await
            .map_err(|err: OutboxError| err.to_string())?;

        if domain_write_fails {
            tx.rollback();
            return Err(format!("duplicate key value for contractor {contractor_id}"));
        }

        tx.commit().await.map_err(|err| err.to_string())?;
        Ok(event)
    }

    pub fn publisher(&self, broker: Arc<ScriptedBroker>) -> OutboxPublisher {
        OutboxPublisher::new(
            Arc::new(self.store.clone()),
            DispatchClient::new(broker, Duration::from_secs(1)),
            self.clock.clone(),
            PublisherConfig {
                poll_interval: Duration::from_secs(5),
                batch_size: DEFAULT_BATCH_SIZE,
            },
        )
    }
}
