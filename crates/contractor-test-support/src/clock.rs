//! Deterministic `Clock` implementations.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use contractor_core::Clock;

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock that advances by a fixed step on every read, so consecutive
/// events get strictly increasing timestamps.
#[derive(Debug)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    step: Duration,
    ticks: AtomicI64,
}

impl SteppingClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step,
            ticks: AtomicI64::new(0),
        }
    }

    /// One-second steps starting at the Unix epoch.
    #[must_use]
    pub fn from_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH, Duration::seconds(1))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + self.step * i32::try_from(tick).unwrap_or(i32::MAX)
    }
}
