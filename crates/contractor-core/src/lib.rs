pub mod clock;
pub mod events;
pub mod models;
pub mod storage;

pub use clock::{Clock, SystemClock};
pub use events::{ContractorChange, EventType, OutboxEvent, UnknownEventType};
pub use models::Contractor;
pub use storage::{
    BrokerError, BrokerMessage, MessageBroker, OutboxStore, OutboxTransaction, StoreError,
};
