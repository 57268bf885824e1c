use std::sync::Arc;

use contractor_core::{Clock, Contractor, EventType};
use contractor_outbox::{OutboxError, OutboxWriter};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use thiserror::Error;
use tracing::info;

use crate::{PgOutboxTx, SaveContractorRequest};

const SELECT_ACTIVE_CONTRACTOR: &str = r#"
    SELECT c.id,
           c.parent_id,
           c.name,
           c.name_full,
           c.inn,
           c.ogrn,
           c.country AS country_id,
           co.name AS country_name,
           c.industry AS industry_id,
           ind.name AS industry_name,
           c.org_form AS org_form_id,
           orgf.name AS org_form_name,
           c.create_date,
           c.modify_date,
           c.create_user_id,
           c.modify_user_id
    FROM contractor c
        LEFT JOIN country co ON c.country = co.id AND co.is_active = TRUE
        LEFT JOIN industry ind ON c.industry = ind.id AND ind.is_active = TRUE
        LEFT JOIN org_form orgf ON c.org_form = orgf.id AND orgf.is_active = TRUE
    WHERE c.is_active = TRUE AND c.id = $1
"#;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Outbox(#[from] OutboxError),
}

/// Contractor writes. Every successful save appends exactly one
/// `contractor-updated` outbox row in the same transaction.
#[derive(Clone)]
pub struct ContractorService {
    pool: PgPool,
    writer: OutboxWriter,
    clock: Arc<dyn Clock>,
}

impl ContractorService {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            writer: OutboxWriter::new(clock.clone()),
            clock,
        }
    }

    pub async fn save(
        &self,
        request: SaveContractorRequest,
        user_id: Option<String>,
    ) -> Result<Contractor, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = request.parent_id.as_deref() {
            if fetch_active(&mut tx, parent_id).await?.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "parent contractor {parent_id} not found"
                )));
            }
        }
        ensure_active_reference(&mut tx, "country", ReferenceKey::Text(&request.country_id))
            .await?;
        ensure_active_reference(&mut tx, "industry", ReferenceKey::Int(request.industry_id))
            .await?;
        ensure_active_reference(&mut tx, "org_form", ReferenceKey::Int(request.org_form_id))
            .await?;

        let now = self.clock.now();
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contractor WHERE id = $1)")
                .bind(&request.id)
                .fetch_one(&mut *tx)
                .await?;

        if exists {
            // Saving a logically deleted contractor brings it back.
            sqlx::query(
                r#"
                UPDATE contractor
                SET parent_id = $2,
                    name = $3,
                    name_full = $4,
                    inn = $5,
                    ogrn = $6,
                    country = $7,
                    industry = $8,
                    org_form = $9,
                    modify_date = $10,
                    modify_user_id = $11,
                    is_active = TRUE
                WHERE id = $1
                "#,
            )
            .bind(&request.id)
            .bind(&request.parent_id)
            .bind(&request.name)
            .bind(&request.name_full)
            .bind(&request.inn)
            .bind(&request.ogrn)
            .bind(&request.country_id)
            .bind(request.industry_id)
            .bind(request.org_form_id)
            .bind(now)
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO contractor (
                    id, parent_id, name, name_full, inn, ogrn, country, industry, org_form,
                    create_date, create_user_id, is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE)
                "#,
            )
            .bind(&request.id)
            .bind(&request.parent_id)
            .bind(&request.name)
            .bind(&request.name_full)
            .bind(&request.inn)
            .bind(&request.ogrn)
            .bind(&request.country_id)
            .bind(request.industry_id)
            .bind(request.org_form_id)
            .bind(now)
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;
        }

        let contractor = fetch_active(&mut tx, &request.id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("contractor {} not found after save", request.id))
        })?;

        let event = self
            .writer
            .append(
                &mut PgOutboxTx::new(&mut tx),
                EventType::ContractorUpdated,
                &contractor.change(now),
            )
            .await?;

        tx.commit().await?;

        info!(
            contractor_id = %contractor.id,
            event_id = %event.id,
            created = !exists,
            "contractor saved"
        );
        Ok(contractor)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Contractor, ServiceError> {
        let mut connection = self.pool.acquire().await?;
        fetch_active(&mut connection, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("contractor {id} not found")))
    }

    /// Logical delete. Downstream consumers are not notified.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let result = sqlx::query("UPDATE contractor SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("contractor {id} not found")));
        }

        info!(contractor_id = %id, "contractor deactivated");
        Ok(())
    }
}

enum ReferenceKey<'a> {
    Text(&'a str),
    Int(i32),
}

async fn ensure_active_reference(
    connection: &mut PgConnection,
    table: &'static str,
    key: ReferenceKey<'_>,
) -> Result<(), ServiceError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1 AND is_active = TRUE)");
    let query = sqlx::query_scalar::<_, bool>(&sql);
    let (query, shown) = match key {
        ReferenceKey::Text(value) => (query.bind(value.to_string()), value.to_string()),
        ReferenceKey::Int(value) => (query.bind(value), value.to_string()),
    };

    if query.fetch_one(&mut *connection).await? {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("{table} {shown} not found")))
    }
}

async fn fetch_active(
    connection: &mut PgConnection,
    id: &str,
) -> Result<Option<Contractor>, ServiceError> {
    let row = sqlx::query(SELECT_ACTIVE_CONTRACTOR)
        .bind(id)
        .fetch_optional(&mut *connection)
        .await?;

    Ok(row.as_ref().map(map_contractor_row).transpose()?)
}

fn map_contractor_row(row: &PgRow) -> Result<Contractor, sqlx::Error> {
    Ok(Contractor {
        id: row.try_get("id")?,
        parent_id: row.try_get("parent_id")?,
        name: row.try_get("name")?,
        name_full: row.try_get("name_full")?,
        inn: row.try_get("inn")?,
        ogrn: row.try_get("ogrn")?,
        country_id: row.try_get("country_id")?,
        country: row.try_get("country_name")?,
        industry_id: row.try_get("industry_id")?,
        industry: row.try_get("industry_name")?,
        org_form_id: row.try_get("org_form_id")?,
        org_form: row.try_get("org_form_name")?,
        create_date: row.try_get("create_date")?,
        modify_date: row.try_get("modify_date")?,
        create_user_id: row.try_get("create_user_id")?,
        modify_user_id: row.try_get("modify_user_id")?,
    })
}
