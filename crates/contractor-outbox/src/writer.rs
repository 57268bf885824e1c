use std::sync::Arc;

use contractor_core::{Clock, ContractorChange, EventType, OutboxEvent, OutboxTransaction};
use tracing::debug;

use crate::{EventCodec, OutboxError};

/// Appends outbox rows inside the caller's transaction.
///
/// The writer never reads the table and never publishes. If the caller's
/// transaction rolls back, the row goes with it.
#[derive(Clone)]
pub struct OutboxWriter {
    codec: EventCodec,
    clock: Arc<dyn Clock>,
}

impl OutboxWriter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            codec: EventCodec,
            clock,
        }
    }

    /// Encodes `change` and inserts it as a pending row. An encode failure
    /// is returned before anything is written, so the caller's write fails
    /// with it.
    pub async fn append<T>(
        &self,
        tx: &mut T,
        event_type: EventType,
        change: &ContractorChange,
    ) -> Result<OutboxEvent, OutboxError>
    where
        T: OutboxTransaction + ?Sized,
    {
        let payload = self.codec.encode(change)?;
        let event = OutboxEvent::new_pending(event_type, payload, self.clock.now());

        tx.insert_outbox_event(&event).await?;

        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            contractor_id = %change.id,
            "outbox event appended"
        );
        Ok(event)
    }
}
