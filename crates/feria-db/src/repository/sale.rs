//! # Sale Repository
//!
//! Database operations for sales.
//!
//! ## Sale Lifecycle
//! ```text
//! insert()            ──► ACTIVE
//! transition(CHANGED) ──► CHANGED    (full-quantity exchange)
//! transition(CANCELLED) ► CANCELLED  (with compensating IN movement)
//! ```
//! Transitions only apply to ACTIVE rows.

use chrono::{DateTime, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use feria_core::dto::SaleFilter;
use feria_core::{Sale, SaleState};

const SELECT_SALE: &str = r#"
    SELECT
        id, event_id, product_id, artisan_id, quantity_sold, value_charged_cents,
        payment_method, card_fee_cents, state, date, created_at, updated_at
    FROM sales
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        Self::find(&self.pool, id).await
    }

    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        Self::fetch_filtered(&self.pool, filter).await
    }

    // -------------------------------------------------------------------------
    // Executor-generic
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %id, "Fetching sale");

        let sale = sqlx::query_as::<_, Sale>(&format!("{} WHERE id = ?1", SELECT_SALE))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(sale)
    }

    /// Sales matching every supplied filter field, in registration order.
    pub async fn fetch_filtered<'e, E>(executor: E, filter: &SaleFilter) -> DbResult<Vec<Sale>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_SALE);
        qb.push(" WHERE 1 = 1");

        if let Some(event_id) = &filter.event_id {
            qb.push(" AND event_id = ").push_bind(event_id.clone());
        }
        if let Some(artisan_id) = &filter.artisan_id {
            qb.push(" AND artisan_id = ").push_bind(artisan_id.clone());
        }
        if let Some(product_id) = &filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id.clone());
        }
        if let Some(state) = filter.state {
            qb.push(" AND state = ").push_bind(state);
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND payment_method = ").push_bind(method);
        }
        qb.push(" ORDER BY date, created_at, rowid");

        let sales = qb.build_query_as::<Sale>().fetch_all(executor).await?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    // -------------------------------------------------------------------------
    // Writes (transaction only)
    // -------------------------------------------------------------------------

    pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, product_id = %sale.product_id, quantity = sale.quantity_sold, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, event_id, product_id, artisan_id, quantity_sold, value_charged_cents,
                payment_method, card_fee_cents, state, date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.event_id)
        .bind(&sale.product_id)
        .bind(&sale.artisan_id)
        .bind(sale.quantity_sold)
        .bind(sale.value_charged_cents)
        .bind(sale.payment_method)
        .bind(sale.card_fee_cents)
        .bind(sale.state)
        .bind(sale.date)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Moves an ACTIVE sale to `state`.
    pub async fn transition(
        conn: &mut SqliteConnection,
        id: &str,
        state: SaleState,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, state = %state, "Transitioning sale");

        let result = sqlx::query("UPDATE sales SET state = ?2, updated_at = ?3 WHERE id = ?1 AND state = ?4")
            .bind(id)
            .bind(state)
            .bind(now)
            .bind(SaleState::Active)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (active)", id));
        }

        Ok(())
    }
}
