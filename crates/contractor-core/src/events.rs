use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Closed set of payload schemas carried by outbox rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    ContractorUpdated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContractorUpdated => "contractor-updated",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "contractor-updated" => Ok(Self::ContractorUpdated),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

/// One row of the `outbox_event` table.
///
/// `payload` holds the exact bytes that go on the wire. `published_at` is
/// set if and only if `pending` is false, and a row never returns to
/// pending once sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub event_type: EventType,
    pub payload: String,
    pub pending: bool,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    pub fn new_pending(event_type: EventType, payload: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            payload,
            pending: true,
            created_at,
            published_at: None,
        }
    }

    /// Moves the row to sent. Returns `false` and leaves the row untouched
    /// when it was already sent.
    pub fn mark_published(&mut self, published_at: DateTime<Utc>) -> bool {
        if !self.pending {
            return false;
        }

        self.pending = false;
        self.published_at = Some(published_at);
        true
    }
}

/// Wire payload of a `contractor-updated` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractorChange {
    pub id: String,
    pub name: String,
    pub inn: Option<String>,
    pub modify_date_time: DateTime<Utc>,
}
