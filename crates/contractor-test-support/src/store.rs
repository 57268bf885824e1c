//! `OutboxStore` wrappers that inject failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contractor_core::{OutboxEvent, OutboxStore, StoreError};
use uuid::Uuid;

/// Delegates to an inner store but fails the first `failures` calls to
/// `mark_published`.
pub struct FlakyMarkStore {
    inner: Arc<dyn OutboxStore>,
    remaining_failures: AtomicUsize,
}

impl FlakyMarkStore {
    #[must_use]
    pub fn new(inner: Arc<dyn OutboxStore>, failures: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl OutboxStore for FlakyMarkStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        self.inner.fetch_pending(limit).await
    }

    async fn mark_published(
        &self,
        id: Uuid,
        published_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let should_fail = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StoreError::Database("connection refused".to_string()));
        }

        self.inner.mark_published(id, published_at).await
    }
}

/// A store whose every call fails.
#[derive(Debug)]
pub struct FailingOutboxStore;

#[async_trait]
impl OutboxStore for FailingOutboxStore {
    async fn fetch_pending(&self, _limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }

    async fn mark_published(
        &self,
        _id: Uuid,
        _published_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }
}
