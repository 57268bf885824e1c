pub mod config;
pub mod contractors;
pub mod contracts;
pub mod db;
pub mod outbox_store;
pub mod redis_bus;

pub use config::{DEFAULT_CONTRACTOR_STREAM, OutboxConfig, RelayConfig, ServiceConfig};
pub use contractors::{ContractorService, ServiceError};
pub use contracts::{ContractorResponse, ReferenceName, SaveContractorRequest};
pub use db::connect_database;
pub use outbox_store::{PgOutboxStore, PgOutboxTx};
pub use redis_bus::RedisBus;
