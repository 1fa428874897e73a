//! # Product Repository
//!
//! Database operations for products.
//!
//! Products carry no stock column; see the inventory repository for the
//! ledger aggregate.

use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use feria_core::dto::ProductFilter;
use feria_core::Product;

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, price_cents, event_id, artisan_id, category, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        Self::find(&self.pool, id).await
    }

    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        Self::fetch_filtered(&self.pool, filter).await
    }

    // -------------------------------------------------------------------------
    // Executor-generic
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %id, "Fetching product");

        let product = sqlx::query_as::<_, Product>(&format!("{} WHERE id = ?1", SELECT_PRODUCT))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    /// Lists products matching every supplied filter field, by name.
    pub async fn fetch_filtered<'e, E>(executor: E, filter: &ProductFilter) -> DbResult<Vec<Product>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_PRODUCT);
        qb.push(" WHERE 1 = 1");

        if let Some(event_id) = &filter.event_id {
            qb.push(" AND event_id = ").push_bind(event_id.clone());
        }
        if let Some(artisan_id) = &filter.artisan_id {
            qb.push(" AND artisan_id = ").push_bind(artisan_id.clone());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        qb.push(" ORDER BY name, id");

        let products = qb.build_query_as::<Product>().fetch_all(executor).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// True when another product already uses the (name, event, artisan)
    /// triple.
    pub async fn triple_taken(
        conn: &mut SqliteConnection,
        name: &str,
        event_id: &str,
        artisan_id: &str,
        exclude_id: Option<&str>,
    ) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE name = ?1 AND event_id = ?2 AND artisan_id = ?3
              AND (?4 IS NULL OR id <> ?4)
            "#,
        )
        .bind(name)
        .bind(event_id)
        .bind(artisan_id)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;

        Ok(count > 0)
    }

    // -------------------------------------------------------------------------
    // Writes (transaction only)
    // -------------------------------------------------------------------------

    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, event_id, artisan_id, category, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(&product.event_id)
        .bind(&product.artisan_id)
        .bind(&product.category)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn update(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                price_cents = ?3,
                category = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(product.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }
}
