use std::sync::Arc;
use std::time::Duration;

use contractor_core::{BrokerMessage, EventType, MessageBroker};
use tracing::debug;
use uuid::Uuid;

use crate::DispatchError;

/// Upper bound on waiting for a broker acknowledgement.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(1);

/// A broker acknowledgement for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub message_id: Uuid,
    pub receipt: String,
}

/// Publish-with-confirmation over a [`MessageBroker`].
#[derive(Clone)]
pub struct DispatchClient {
    broker: Arc<dyn MessageBroker>,
    confirm_timeout: Duration,
}

impl DispatchClient {
    pub fn new(broker: Arc<dyn MessageBroker>, confirm_timeout: Duration) -> Self {
        Self {
            broker,
            confirm_timeout,
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        self.confirm_timeout
    }

    /// Sends one message and waits for the broker to acknowledge it.
    ///
    /// `message_id` becomes the message identity; when absent a fresh one is
    /// generated. Passing the same id on every retry of a logical event lets
    /// consumers deduplicate. Transport errors, nacks and a missing
    /// acknowledgement within the confirm timeout are all returned as errors.
    pub async fn dispatch(
        &self,
        message_id: Option<Uuid>,
        event_type: EventType,
        payload: &str,
    ) -> Result<Confirmation, DispatchError> {
        let message = BrokerMessage {
            message_id: message_id.unwrap_or_else(Uuid::new_v4),
            event_type,
            payload: payload.to_string(),
        };

        let receipt = tokio::time::timeout(
            self.confirm_timeout,
            self.broker.publish_confirmed(&message),
        )
        .await
        .map_err(|_| DispatchError::Timeout(self.confirm_timeout))??;

        debug!(
            message_id = %message.message_id,
            event_type = %event_type,
            receipt = %receipt,
            "broker confirmed message"
        );

        Ok(Confirmation {
            message_id: message.message_id,
            receipt,
        })
    }
}
