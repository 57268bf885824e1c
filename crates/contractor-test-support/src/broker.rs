//! Scripted `MessageBroker` for dispatch and publisher tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use contractor_core::{BrokerError, BrokerMessage, MessageBroker};

/// How the broker answers one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerReply {
    /// Acknowledge the message.
    Confirm,
    /// Nack the message.
    Reject,
    /// Fail before reaching the broker.
    Disconnect,
    /// Hold the call open for the given time, then acknowledge.
    Stall(Duration),
}

/// A broker that answers attempts from a script, falling back to a default
/// reply once the script is exhausted. Every attempt is recorded, and
/// acknowledged messages are recorded separately.
#[derive(Debug)]
pub struct ScriptedBroker {
    script: Mutex<VecDeque<BrokerReply>>,
    fallback: BrokerReply,
    attempts: Mutex<Vec<BrokerMessage>>,
    confirmed: Mutex<Vec<BrokerMessage>>,
}

impl ScriptedBroker {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = BrokerReply>, fallback: BrokerReply) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            attempts: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    /// Acknowledges everything.
    #[must_use]
    pub fn confirming() -> Self {
        Self::new([], BrokerReply::Confirm)
    }

    /// Rejects everything.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::new([], BrokerReply::Reject)
    }

    /// Queues more replies ahead of the fallback.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_replies(&self, replies: impl IntoIterator<Item = BrokerReply>) {
        self.script.lock().unwrap().extend(replies);
    }

    /// Every publish attempt, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempts(&self) -> Vec<BrokerMessage> {
        self.attempts.lock().unwrap().clone()
    }

    /// Acknowledged messages, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn confirmed(&self) -> Vec<BrokerMessage> {
        self.confirmed.lock().unwrap().clone()
    }

    fn next_reply(&self) -> BrokerReply {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

#[async_trait]
impl MessageBroker for ScriptedBroker {
    async fn publish_confirmed(&self, message: &BrokerMessage) -> Result<String, BrokerError> {
        self.attempts.lock().unwrap().push(message.clone());

        match self.next_reply() {
            BrokerReply::Confirm => {}
            BrokerReply::Reject => {
                return Err(BrokerError::Rejected("nack".to_string()));
            }
            BrokerReply::Disconnect => {
                return Err(BrokerError::Transport("connection reset".to_string()));
            }
            BrokerReply::Stall(delay) => tokio::time::sleep(delay).await,
        }

        let mut confirmed = self.confirmed.lock().unwrap();
        confirmed.push(message.clone());
        Ok(format!("{}-0", confirmed.len()))
    }
}
