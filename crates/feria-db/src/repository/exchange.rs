//! # Exchange Repository
//!
//! Database operations for product changes. `sale_id` is UNIQUE in the
//! schema, so a second exchange for a sale cannot be stored even if the
//! service check were bypassed.

use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use feria_core::dto::ExchangeFilter;
use feria_core::ProductChange;

const SELECT_CHANGE: &str = r#"
    SELECT
        c.id, c.sale_id, c.product_returned_id, c.product_delivered_id, c.quantity,
        c.delivered_product_price_cents, c.value_difference_cents,
        c.payment_method_difference, c.card_fee_difference_cents, c.created_at
    FROM product_changes c
"#;

/// Repository for product change database operations.
#[derive(Debug, Clone)]
pub struct ExchangeRepository {
    pool: SqlitePool,
}

impl ExchangeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExchangeRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductChange>> {
        Self::find(&self.pool, id).await
    }

    pub async fn list(&self, filter: &ExchangeFilter) -> DbResult<Vec<ProductChange>> {
        Self::fetch_filtered(&self.pool, filter).await
    }

    // -------------------------------------------------------------------------
    // Executor-generic
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<ProductChange>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %id, "Fetching exchange");

        let change = sqlx::query_as::<_, ProductChange>(&format!("{} WHERE c.id = ?1", SELECT_CHANGE))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(change)
    }

    pub async fn find_by_sale<'e, E>(executor: E, sale_id: &str) -> DbResult<Option<ProductChange>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let change = sqlx::query_as::<_, ProductChange>(&format!("{} WHERE c.sale_id = ?1", SELECT_CHANGE))
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;

        Ok(change)
    }

    /// Exchanges matching every supplied filter field, oldest first.
    pub async fn fetch_filtered<'e, E>(executor: E, filter: &ExchangeFilter) -> DbResult<Vec<ProductChange>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_CHANGE);

        if filter.event_id.is_some() {
            qb.push(" JOIN sales s ON s.id = c.sale_id");
        }
        qb.push(" WHERE 1 = 1");

        if let Some(sale_id) = &filter.sale_id {
            qb.push(" AND c.sale_id = ").push_bind(sale_id.clone());
        }
        if let Some(event_id) = &filter.event_id {
            qb.push(" AND s.event_id = ").push_bind(event_id.clone());
        }
        if let Some(product_id) = &filter.product_id {
            qb.push(" AND (c.product_returned_id = ")
                .push_bind(product_id.clone())
                .push(" OR c.product_delivered_id = ")
                .push_bind(product_id.clone())
                .push(")");
        }
        qb.push(" ORDER BY c.created_at, c.rowid");

        let changes = qb
            .build_query_as::<ProductChange>()
            .fetch_all(executor)
            .await?;

        debug!(count = changes.len(), "Listed exchanges");
        Ok(changes)
    }

    // -------------------------------------------------------------------------
    // Writes (transaction only)
    // -------------------------------------------------------------------------

    pub async fn insert(conn: &mut SqliteConnection, change: &ProductChange) -> DbResult<()> {
        debug!(id = %change.id, sale_id = %change.sale_id, "Inserting exchange");

        sqlx::query(
            r#"
            INSERT INTO product_changes (
                id, sale_id, product_returned_id, product_delivered_id, quantity,
                delivered_product_price_cents, value_difference_cents,
                payment_method_difference, card_fee_difference_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&change.id)
        .bind(&change.sale_id)
        .bind(&change.product_returned_id)
        .bind(&change.product_delivered_id)
        .bind(change.quantity)
        .bind(change.delivered_product_price_cents)
        .bind(change.value_difference_cents)
        .bind(change.payment_method_difference)
        .bind(change.card_fee_difference_cents)
        .bind(change.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
