use std::time::Duration;

use contractor_core::{BrokerError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Errors surfaced to the domain write path.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A dispatch that did not end in a broker confirmation. Always recoverable:
/// the event stays pending and is retried on the next cycle.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("broker transport failed: {0}")]
    Transport(String),

    #[error("broker rejected message: {0}")]
    Rejected(String),

    #[error("no broker confirmation within {0:?}")]
    Timeout(Duration),
}

impl From<BrokerError> for DispatchError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Transport(reason) => Self::Transport(reason),
            BrokerError::Rejected(reason) => Self::Rejected(reason),
        }
    }
}
