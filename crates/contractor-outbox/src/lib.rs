//! Transactional outbox for contractor change notifications.
//!
//! A domain write appends an [`OutboxEvent`](contractor_core::OutboxEvent)
//! through [`OutboxWriter`] inside its own transaction. A single
//! [`OutboxPublisher`] task per process then polls the store on a fixed
//! period, dispatches pending rows oldest first through a
//! [`DispatchClient`], and marks each row sent once the broker confirms it.
//! Delivery is at-least-once: every message carries the outbox row id as its
//! identity so consumers can drop duplicates.

mod codec;
mod dispatch;
mod error;
mod memory;
mod publisher;
mod writer;

pub use codec::EventCodec;
pub use dispatch::{Confirmation, DEFAULT_CONFIRM_TIMEOUT, DispatchClient};
pub use error::{CodecError, DispatchError, OutboxError};
pub use memory::{InMemoryOutboxStore, MemoryTransaction};
pub use publisher::{
    CycleReport, DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL, OutboxPublisher, PublisherConfig,
    PublisherHandle, PublisherStats,
};
pub use writer::OutboxWriter;
