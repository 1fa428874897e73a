//! # Inventory Repository
//!
//! The append-only movement ledger and the stock aggregate derived from it.
//!
//! ## Stock Derivation
//! ```text
//! inventory_movements (product p-1)
//! ┌──────┬─────┬──────────────────────────┐
//! │ type │ qty │ reason                   │
//! ├──────┼─────┼──────────────────────────┤
//! │ IN   │ 10  │ initial stock            │   total_in  = 10 + 2 = 12
//! │ OUT  │  3  │ direct sale              │   total_out = 3
//! │ IN   │  2  │ return from exchange     │   stock     = 12 − 3 = 9
//! └──────┴─────┴──────────────────────────┘
//! ```
//!
//! There is no update or delete: corrections are compensating movements.

use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use feria_core::dto::{MovementFilter, StockTotals};
use feria_core::{InventoryMovement, MovementType};

const SELECT_MOVEMENT: &str = r#"
    SELECT
        m.id, m.movement_type, m.quantity, m.reason,
        m.product_id, m.sale_id, m.change_id, m.created_at
    FROM inventory_movements m
"#;

/// Repository for the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Stock for a product; zero when it has no movements.
    pub async fn current_stock(&self, product_id: &str) -> DbResult<i64> {
        Ok(Self::totals(&self.pool, product_id).await?.stock())
    }

    pub async fn list(&self, filter: &MovementFilter) -> DbResult<Vec<InventoryMovement>> {
        Self::fetch_filtered(&self.pool, filter).await
    }

    // -------------------------------------------------------------------------
    // Executor-generic
    // -------------------------------------------------------------------------

    /// Σ IN and Σ OUT for one product.
    pub async fn totals<'e, E>(executor: E, product_id: &str) -> DbResult<StockTotals>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (total_in, total_out): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN movement_type = 'IN' THEN quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN movement_type = 'OUT' THEN quantity ELSE 0 END), 0)
            FROM inventory_movements
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(executor)
        .await?;

        debug!(product_id = %product_id, total_in, total_out, "Computed stock totals");
        Ok(StockTotals { total_in, total_out })
    }

    /// Ledger entries matching every supplied filter field, oldest first.
    pub async fn fetch_filtered<'e, E>(executor: E, filter: &MovementFilter) -> DbResult<Vec<InventoryMovement>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_MOVEMENT);

        if filter.event_id.is_some() {
            qb.push(" JOIN products p ON p.id = m.product_id");
        }
        qb.push(" WHERE 1 = 1");

        if let Some(product_id) = &filter.product_id {
            qb.push(" AND m.product_id = ").push_bind(product_id.clone());
        }
        if let Some(event_id) = &filter.event_id {
            qb.push(" AND p.event_id = ").push_bind(event_id.clone());
        }
        if let Some(movement_type) = filter.movement_type {
            qb.push(" AND m.movement_type = ").push_bind(movement_type);
        }
        if let Some(sale_id) = &filter.sale_id {
            qb.push(" AND m.sale_id = ").push_bind(sale_id.clone());
        }
        if let Some(change_id) = &filter.change_id {
            qb.push(" AND m.change_id = ").push_bind(change_id.clone());
        }
        qb.push(" ORDER BY m.created_at, m.rowid");

        let movements = qb
            .build_query_as::<InventoryMovement>()
            .fetch_all(executor)
            .await?;

        debug!(count = movements.len(), "Listed movements");
        Ok(movements)
    }

    /// Number of OUT movements already keyed to (product, sale).
    pub async fn count_sale_outs(conn: &mut SqliteConnection, product_id: &str, sale_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM inventory_movements
            WHERE product_id = ?1 AND sale_id = ?2 AND movement_type = ?3
            "#,
        )
        .bind(product_id)
        .bind(sale_id)
        .bind(MovementType::Out)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Total number of movements for a product, of either direction.
    pub async fn count_for_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_movements WHERE product_id = ?1")
            .bind(product_id)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Writes (transaction only)
    // -------------------------------------------------------------------------

    /// Appends one entry. Callers have already checked sufficiency for OUT
    /// entries on the same connection.
    pub async fn append(conn: &mut SqliteConnection, movement: &InventoryMovement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            product_id = %movement.product_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "Appending movement"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, movement_type, quantity, reason, product_id, sale_id, change_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement.id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(&movement.reason)
        .bind(&movement.product_id)
        .bind(&movement.sale_id)
        .bind(&movement.change_id)
        .bind(movement.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
