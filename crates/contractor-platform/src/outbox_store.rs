//! Postgres-backed `outbox_event` table. The schema lives in
//! `migrations/20250101000003_outbox_event.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contractor_core::{EventType, OutboxEvent, OutboxStore, OutboxTransaction, StoreError};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::error;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, payload, pending, created_at, published_at
            FROM outbox_event
            WHERE pending = TRUE
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        // A row that cannot be mapped is skipped so it does not hold back
        // the rest of the batch; it stays pending for an operator to fix.
        Ok(rows
            .iter()
            .filter_map(|row| match map_outbox_row(row) {
                Ok(event) => Some(event),
                Err(err) => {
                    error!("skipping unreadable outbox row: {err}");
                    None
                }
            })
            .collect())
    }

    async fn mark_published(
        &self,
        id: Uuid,
        published_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_event
            SET pending = FALSE, published_at = $2
            WHERE id = $1 AND pending = TRUE
            "#,
        )
        .bind(id)
        .bind(published_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM outbox_event WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(database_error)?;

        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound(id))
        }
    }
}

/// Outbox inserts bound to an open Postgres transaction.
pub struct PgOutboxTx<'a, 'c> {
    tx: &'a mut Transaction<'c, Postgres>,
}

impl<'a, 'c> PgOutboxTx<'a, 'c> {
    pub fn new(tx: &'a mut Transaction<'c, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl<'a, 'c> OutboxTransaction for PgOutboxTx<'a, 'c> {
    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO outbox_event (id, event_type, payload, pending, created_at, published_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(event.event_type.as_str())
        .bind(&event.payload)
        .bind(event.pending)
        .bind(event.created_at)
        .bind(event.published_at)
        .execute(&mut **self.tx)
        .await
        .map_err(database_error)?;

        Ok(())
    }
}

fn map_outbox_row(row: &PgRow) -> Result<OutboxEvent, StoreError> {
    let id: Uuid = row.try_get("id").map_err(database_error)?;
    let event_type_raw: String = row.try_get("event_type").map_err(database_error)?;
    let event_type: EventType = event_type_raw.parse().map_err(|err| StoreError::Corrupt {
        id,
        reason: format!("{err}"),
    })?;

    Ok(OutboxEvent {
        id,
        event_type,
        payload: row.try_get("payload").map_err(database_error)?,
        pending: row.try_get("pending").map_err(database_error)?,
        created_at: row.try_get("created_at").map_err(database_error)?,
        published_at: row.try_get("published_at").map_err(database_error)?,
    })
}

pub(crate) fn database_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}
