use std::sync::Arc;
use std::time::Duration;

use contractor_core::{Clock, OutboxEvent, OutboxStore, StoreError};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{DispatchClient, EventCodec};

/// Maximum rows selected per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Period between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Outcome counts for one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub selected: usize,
    pub published: usize,
    /// Not confirmed by the broker, or not dispatchable; left pending.
    pub failed: usize,
    /// Confirmed by the broker but not marked; will be sent again.
    pub mark_failed: usize,
}

/// Totals accumulated by a running publisher.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublisherStats {
    pub cycles: usize,
    pub failed_cycles: usize,
    pub published: usize,
    pub failed: usize,
    pub mark_failed: usize,
}

impl PublisherStats {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.published += report.published;
        self.failed += report.failed;
        self.mark_failed += report.mark_failed;
    }
}

enum EventOutcome {
    Published,
    Failed,
    MarkFailed,
}

/// Polls the outbox and relays pending rows to the broker.
///
/// Assumes it is the only publisher working on the store: two instances
/// would select and dispatch the same rows.
pub struct OutboxPublisher {
    store: Arc<dyn OutboxStore>,
    dispatcher: DispatchClient,
    codec: EventCodec,
    clock: Arc<dyn Clock>,
    config: PublisherConfig,
}

impl OutboxPublisher {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        dispatcher: DispatchClient,
        clock: Arc<dyn Clock>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            codec: EventCodec,
            clock,
            config,
        }
    }

    /// Runs one select/dispatch/mark pass.
    ///
    /// Events are dispatched one at a time in creation order. A failure on
    /// one event never stops the rest of the batch; only a failed select
    /// aborts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let batch = self.store.fetch_pending(self.config.batch_size).await?;
        let mut report = CycleReport {
            selected: batch.len(),
            ..CycleReport::default()
        };

        for event in &batch {
            match self.publish_event(event).await {
                EventOutcome::Published => report.published += 1,
                EventOutcome::Failed => report.failed += 1,
                EventOutcome::MarkFailed => report.mark_failed += 1,
            }
        }

        if report.selected > 0 {
            info!(
                selected = report.selected,
                published = report.published,
                failed = report.failed,
                mark_failed = report.mark_failed,
                "outbox cycle finished"
            );
        }
        Ok(report)
    }

    async fn publish_event(&self, event: &OutboxEvent) -> EventOutcome {
        if let Err(err) = self.codec.verify(event.event_type, &event.payload) {
            error!(
                event_id = %event.id,
                event_type = %event.event_type,
                "stored payload does not match its schema, leaving pending: {err}"
            );
            return EventOutcome::Failed;
        }

        let confirmation = match self
            .dispatcher
            .dispatch(Some(event.id), event.event_type, &event.payload)
            .await
        {
            Ok(confirmation) => confirmation,
            Err(err) => {
                warn!(event_id = %event.id, error = %err, "dispatch failed, will retry next cycle");
                return EventOutcome::Failed;
            }
        };

        match self.store.mark_published(event.id, self.clock.now()).await {
            Ok(true) => {
                debug!(
                    event_id = %event.id,
                    receipt = %confirmation.receipt,
                    "outbox event published"
                );
                EventOutcome::Published
            }
            Ok(false) => {
                warn!(event_id = %event.id, "outbox event was already marked published");
                EventOutcome::Published
            }
            Err(err) => {
                error!(
                    event_id = %event.id,
                    error = %err,
                    "failed to mark confirmed event, it will be delivered again"
                );
                EventOutcome::MarkFailed
            }
        }
    }

    /// Runs cycles on the poll interval until `shutdown` flips to `true` or
    /// its sender is dropped. A cycle in progress always runs to completion.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> PublisherStats {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = PublisherStats::default();

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            confirm_timeout_ms = self.dispatcher.confirm_timeout().as_millis() as u64,
            "outbox publisher started"
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            match self.run_cycle().await {
                Ok(report) => stats.record(&report),
                Err(err) => {
                    stats.failed_cycles += 1;
                    error!("failed to select pending outbox events: {err}");
                }
            }
        }

        info!(
            cycles = stats.cycles,
            published = stats.published,
            "outbox publisher stopped"
        );
        stats
    }

    /// Moves the publisher onto its own task.
    pub fn spawn(self) -> PublisherHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        PublisherHandle { shutdown, task }
    }
}

pub struct PublisherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<PublisherStats>,
}

impl PublisherHandle {
    /// Signals the loop to stop and waits for it, returning its totals.
    pub async fn shutdown(self) -> Result<PublisherStats, JoinError> {
        let _ = self.shutdown.send(true);
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use contractor_core::{ContractorChange, EventType};
    use contractor_test_support::{
        BrokerReply, FailingOutboxStore, FlakyMarkStore, ScriptedBroker, SteppingClock,
    };

    use super::*;
    use crate::{DEFAULT_CONFIRM_TIMEOUT, InMemoryOutboxStore, OutboxWriter};

    struct Fixture {
        store: InMemoryOutboxStore,
        broker: Arc<ScriptedBroker>,
        clock: Arc<SteppingClock>,
    }

    impl Fixture {
        fn new(broker: ScriptedBroker) -> Self {
            Self {
                store: InMemoryOutboxStore::new(),
                broker: Arc::new(broker),
                clock: Arc::new(SteppingClock::from_epoch()),
            }
        }

        async fn append(&self, contractor_id: &str) -> OutboxEvent {
            let writer = OutboxWriter::new(self.clock.clone());
            let change = ContractorChange {
                id: contractor_id.to_string(),
                name: format!("{contractor_id} name"),
                inn: None,
                modify_date_time: self.clock.now(),
            };
            let mut tx = self.store.begin();
            let event = writer
                .append(&mut tx, EventType::ContractorUpdated, &change)
                .await
                .unwrap();
            tx.commit().await.unwrap();
            event
        }

        fn publisher_over(
            &self,
            store: Arc<dyn OutboxStore>,
            batch_size: usize,
        ) -> OutboxPublisher {
            OutboxPublisher::new(
                store,
                DispatchClient::new(self.broker.clone(), DEFAULT_CONFIRM_TIMEOUT),
                self.clock.clone(),
                PublisherConfig {
                    poll_interval: Duration::from_secs(5),
                    batch_size,
                },
            )
        }

        fn publisher(&self) -> OutboxPublisher {
            self.publisher_over(Arc::new(self.store.clone()), DEFAULT_BATCH_SIZE)
        }
    }

    #[tokio::test]
    async fn empty_store_dispatches_nothing() {
        let fixture = Fixture::new(ScriptedBroker::confirming());

        let report = fixture.publisher().run_cycle().await.unwrap();

        assert_eq!(report, CycleReport::default());
        assert!(fixture.broker.attempts().is_empty());
    }

    #[tokio::test]
    async fn failure_in_the_middle_does_not_block_siblings() {
        let fixture = Fixture::new(ScriptedBroker::new(
            [BrokerReply::Confirm, BrokerReply::Reject, BrokerReply::Confirm],
            BrokerReply::Confirm,
        ));
        let first = fixture.append("CTR001").await;
        let second = fixture.append("CTR002").await;
        let third = fixture.append("CTR003").await;

        let report = fixture.publisher().run_cycle().await.unwrap();

        assert_eq!(report.selected, 3);
        assert_eq!(report.published, 2);
        assert_eq!(report.failed, 1);
        assert!(!fixture.store.get(first.id).await.unwrap().pending);
        assert!(fixture.store.get(second.id).await.unwrap().pending);
        assert!(!fixture.store.get(third.id).await.unwrap().pending);
    }

    #[tokio::test]
    async fn batch_is_capped_at_oldest_rows() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        let mut appended = Vec::new();
        for n in 0..5 {
            appended.push(fixture.append(&format!("CTR{n:03}")).await);
        }
        let publisher = fixture.publisher_over(Arc::new(fixture.store.clone()), 3);

        let report = publisher.run_cycle().await.unwrap();

        assert_eq!(report.selected, 3);
        let dispatched: Vec<_> = fixture
            .broker
            .attempts()
            .iter()
            .map(|message| message.message_id)
            .collect();
        let oldest: Vec<_> = appended.iter().take(3).map(|event| event.id).collect();
        assert_eq!(dispatched, oldest);
        assert_eq!(fixture.store.pending_count().await, 2);
    }

    #[tokio::test]
    async fn mark_failure_redelivers_with_same_identity() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        let event = fixture.append("CTR001").await;
        let flaky = Arc::new(FlakyMarkStore::new(Arc::new(fixture.store.clone()), 1));
        let publisher = fixture.publisher_over(flaky, DEFAULT_BATCH_SIZE);

        let first = publisher.run_cycle().await.unwrap();
        assert_eq!(first.mark_failed, 1);
        assert!(fixture.store.get(event.id).await.unwrap().pending);

        let second = publisher.run_cycle().await.unwrap();
        assert_eq!(second.published, 1);

        let attempts = fixture.broker.attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|message| message.message_id == event.id));
        assert!(!fixture.store.get(event.id).await.unwrap().pending);
    }

    #[tokio::test]
    async fn undecodable_payload_stays_pending_without_dispatch() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        let broken = OutboxEvent::new_pending(
            EventType::ContractorUpdated,
            "{\"id\":".to_string(),
            fixture.clock.now(),
        );
        let mut tx = fixture.store.begin();
        contractor_core::OutboxTransaction::insert_outbox_event(&mut tx, &broken)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        let healthy = fixture.append("CTR002").await;

        let report = fixture.publisher().run_cycle().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.published, 1);
        assert!(fixture.store.get(broken.id).await.unwrap().pending);
        assert!(!fixture.store.get(healthy.id).await.unwrap().pending);
        let attempts = fixture.broker.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].message_id, healthy.id);
    }

    #[tokio::test]
    async fn select_failure_aborts_cycle() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        let publisher = fixture.publisher_over(Arc::new(FailingOutboxStore), DEFAULT_BATCH_SIZE);

        assert!(publisher.run_cycle().await.is_err());
        assert!(fixture.broker.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_publisher_polls_until_shutdown() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        let event = fixture.append("CTR001").await;
        let handle = fixture.publisher().spawn();

        tokio::time::sleep(Duration::from_secs(11)).await;
        let stats = handle.shutdown().await.unwrap();

        assert!(stats.cycles >= 2);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.failed_cycles, 0);
        assert_eq!(fixture.broker.attempts().len(), 1);
        assert!(!fixture.store.get(event.id).await.unwrap().pending);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_publisher_survives_store_outage() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        let handle = fixture
            .publisher_over(Arc::new(FailingOutboxStore), DEFAULT_BATCH_SIZE)
            .spawn();

        tokio::time::sleep(Duration::from_secs(6)).await;
        let stats = handle.shutdown().await.unwrap();

        assert_eq!(stats.cycles, 0);
        assert!(stats.failed_cycles >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wins_over_a_ready_tick() {
        let fixture = Fixture::new(ScriptedBroker::confirming());
        fixture.append("CTR001").await;
        let (shutdown, receiver) = watch::channel(false);
        shutdown.send(true).unwrap();

        // The first interval tick is ready immediately, alongside the signal.
        let stats = fixture.publisher().run(receiver).await;

        assert_eq!(stats.cycles, 0);
        assert!(fixture.broker.attempts().is_empty());
        assert_eq!(fixture.store.pending_count().await, 1);
    }
}
