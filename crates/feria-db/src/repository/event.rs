//! # Event Repository
//!
//! Database operations for fairs. The phase is never stored; only the
//! explicit `closed` flag is.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use feria_core::Event;

const SELECT_EVENT: &str = r#"
    SELECT
        id, name, location, start_date, end_date,
        commission_association_bps, commission_seller_bps,
        closed, created_at, updated_at
    FROM events
"#;

/// Repository for event database operations.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Event>> {
        Self::find(&self.pool, id).await
    }

    /// All events ordered by start date.
    pub async fn list(&self) -> DbResult<Vec<Event>> {
        Self::fetch_all(&self.pool).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Executor-generic
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Event>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %id, "Fetching event");

        let event = sqlx::query_as::<_, Event>(&format!("{} WHERE id = ?1", SELECT_EVENT))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(event)
    }

    pub async fn fetch_all<'e, E>(executor: E) -> DbResult<Vec<Event>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let events = sqlx::query_as::<_, Event>(&format!(
            "{} ORDER BY start_date, created_at",
            SELECT_EVENT
        ))
        .fetch_all(executor)
        .await?;

        debug!(count = events.len(), "Listed events");
        Ok(events)
    }

    // -------------------------------------------------------------------------
    // Writes (transaction only)
    // -------------------------------------------------------------------------

    pub async fn insert(conn: &mut SqliteConnection, event: &Event) -> DbResult<()> {
        debug!(id = %event.id, name = %event.name, "Inserting event");

        sqlx::query(
            r#"
            INSERT INTO events (
                id, name, location, start_date, end_date,
                commission_association_bps, commission_seller_bps,
                closed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.commission_association_bps)
        .bind(event.commission_seller_bps)
        .bind(event.closed)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rewrites every mutable column of `event`.
    pub async fn update(conn: &mut SqliteConnection, event: &Event) -> DbResult<()> {
        debug!(id = %event.id, "Updating event");

        let result = sqlx::query(
            r#"
            UPDATE events SET
                name = ?2,
                location = ?3,
                start_date = ?4,
                end_date = ?5,
                commission_association_bps = ?6,
                commission_seller_bps = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.location)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.commission_association_bps)
        .bind(event.commission_seller_bps)
        .bind(event.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Event", &event.id));
        }

        Ok(())
    }

    pub async fn mark_closed(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "Closing event");

        let result = sqlx::query("UPDATE events SET closed = 1, updated_at = ?2 WHERE id = ?1 AND closed = 0")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Event (open)", id));
        }

        Ok(())
    }
}
