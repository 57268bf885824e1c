use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contractor_core::{OutboxEvent, OutboxStore, OutboxTransaction, StoreError};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outbox table held in memory. Clones share the same rows.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    rows: Arc<RwLock<Vec<OutboxEvent>>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction whose inserts stay invisible until commit.
    pub fn begin(&self) -> MemoryTransaction {
        MemoryTransaction {
            rows: Arc::clone(&self.rows),
            staged: Vec::new(),
        }
    }

    pub async fn rows(&self) -> Vec<OutboxEvent> {
        self.rows.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<OutboxEvent> {
        self.rows.read().await.iter().find(|row| row.id == id).cloned()
    }

    pub async fn pending_count(&self) -> usize {
        self.rows.read().await.iter().filter(|row| row.pending).count()
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        let rows = self.rows.read().await;
        let mut pending: Vec<OutboxEvent> =
            rows.iter().filter(|row| row.pending).cloned().collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_published(
        &self,
        id: Uuid,
        published_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(row.mark_published(published_at))
    }
}

/// Staged inserts against an [`InMemoryOutboxStore`]. Dropping the
/// transaction without committing discards them.
pub struct MemoryTransaction {
    rows: Arc<RwLock<Vec<OutboxEvent>>>,
    staged: Vec<OutboxEvent>,
}

impl MemoryTransaction {
    pub async fn commit(self) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        for event in &self.staged {
            if rows.iter().any(|row| row.id == event.id) {
                return Err(StoreError::Database(format!(
                    "duplicate key value violates unique constraint: {}",
                    event.id
                )));
            }
        }
        rows.extend(self.staged);
        Ok(())
    }

    pub fn rollback(self) {}
}

#[async_trait]
impl OutboxTransaction for MemoryTransaction {
    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<(), StoreError> {
        if self.staged.iter().any(|staged| staged.id == event.id) {
            return Err(StoreError::Database(format!(
                "duplicate key value violates unique constraint: {}",
                event.id
            )));
        }
        self.staged.push(event.clone());
        Ok(())
    }
}
