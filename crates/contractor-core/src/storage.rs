use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::events::{EventType, OutboxEvent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("outbox event not found: {0}")]
    NotFound(Uuid),

    #[error("corrupt outbox row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

/// Insert access to the outbox table through the caller's open transaction.
///
/// The row becomes visible only if that transaction commits.
#[async_trait]
pub trait OutboxTransaction: Send {
    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<(), StoreError>;
}

/// Read/update access used by the publisher.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Oldest pending rows first, at most `limit`.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError>;

    /// Marks a pending row as sent. Returns `false` when the row had
    /// already been sent, in which case nothing changes.
    async fn mark_published(
        &self,
        id: Uuid,
        published_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub message_id: Uuid,
    pub event_type: EventType,
    pub payload: String,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker transport failed: {0}")]
    Transport(String),

    #[error("broker rejected message: {0}")]
    Rejected(String),
}

/// Broker transport. Implementations return only once the broker has
/// acknowledged the message, yielding the broker's receipt for it.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish_confirmed(&self, message: &BrokerMessage) -> Result<String, BrokerError>;
}
