//! Shared test doubles for the contractor outbox pipeline.

mod broker;
mod clock;
mod store;

pub use broker::{BrokerReply, ScriptedBroker};
pub use clock::{FixedClock, SteppingClock};
pub use store::{FailingOutboxStore, FlakyMarkStore};
