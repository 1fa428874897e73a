//! # Artisan Repository
//!
//! Database operations for artisans.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use feria_core::Artisan;

const SELECT_ARTISAN: &str = r#"
    SELECT id, name, identification, active, created_at, updated_at
    FROM artisans
"#;

/// Counts of records that reference an artisan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtisanDependents {
    pub products: i64,
    pub sales: i64,
}

impl ArtisanDependents {
    pub fn is_empty(&self) -> bool {
        self.products == 0 && self.sales == 0
    }
}

/// Repository for artisan database operations.
#[derive(Debug, Clone)]
pub struct ArtisanRepository {
    pool: SqlitePool,
}

impl ArtisanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ArtisanRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Artisan>> {
        Self::find(&self.pool, id).await
    }

    /// Lists artisans by name, optionally only the active ones.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Artisan>> {
        Self::fetch_all(&self.pool, active_only).await
    }

    // -------------------------------------------------------------------------
    // Executor-generic
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Artisan>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %id, "Fetching artisan");

        let artisan = sqlx::query_as::<_, Artisan>(&format!("{} WHERE id = ?1", SELECT_ARTISAN))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(artisan)
    }

    pub async fn find_by_identification<'e, E>(executor: E, identification: &str) -> DbResult<Option<Artisan>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let artisan = sqlx::query_as::<_, Artisan>(&format!(
            "{} WHERE identification = ?1",
            SELECT_ARTISAN
        ))
        .bind(identification)
        .fetch_optional(executor)
        .await?;

        Ok(artisan)
    }

    pub async fn fetch_all<'e, E>(executor: E, active_only: bool) -> DbResult<Vec<Artisan>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = if active_only {
            format!("{} WHERE active = 1 ORDER BY name, id", SELECT_ARTISAN)
        } else {
            format!("{} ORDER BY name, id", SELECT_ARTISAN)
        };

        let artisans = sqlx::query_as::<_, Artisan>(&sql).fetch_all(executor).await?;

        debug!(count = artisans.len(), active_only, "Listed artisans");
        Ok(artisans)
    }

    /// Artisans referenced by the sales of one event.
    pub async fn fetch_for_event<'e, E>(executor: E, event_id: &str) -> DbResult<Vec<Artisan>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let artisans = sqlx::query_as::<_, Artisan>(&format!(
            "{} WHERE id IN (SELECT DISTINCT artisan_id FROM sales WHERE event_id = ?1) ORDER BY name, id",
            SELECT_ARTISAN
        ))
        .bind(event_id)
        .fetch_all(executor)
        .await?;

        Ok(artisans)
    }

    pub async fn dependents(conn: &mut SqliteConnection, id: &str) -> DbResult<ArtisanDependents> {
        let (products, sales): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products WHERE artisan_id = ?1),
                (SELECT COUNT(*) FROM sales WHERE artisan_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(ArtisanDependents { products, sales })
    }

    // -------------------------------------------------------------------------
    // Writes (transaction only)
    // -------------------------------------------------------------------------

    pub async fn insert(conn: &mut SqliteConnection, artisan: &Artisan) -> DbResult<()> {
        debug!(id = %artisan.id, identification = %artisan.identification, "Inserting artisan");

        sqlx::query(
            r#"
            INSERT INTO artisans (id, name, identification, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&artisan.id)
        .bind(&artisan.name)
        .bind(&artisan.identification)
        .bind(artisan.active)
        .bind(artisan.created_at)
        .bind(artisan.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn set_active(
        conn: &mut SqliteConnection,
        id: &str,
        active: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, active, "Setting artisan active flag");

        let result = sqlx::query("UPDATE artisans SET active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(now)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Artisan", id));
        }

        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting artisan");

        let result = sqlx::query("DELETE FROM artisans WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Artisan", id));
        }

        Ok(())
    }
}
