//! # Service Layer
//!
//! Every operation the controllers call. Workflows follow one shape:
//!
//! ```text
//! begin_write() ──► load records via tx.conn() ──► Rules::run()
//!                                                     │
//!                         ┌───────── fail ────────────┤
//!                         ▼                           ▼ pass
//!              warn!, drop tx (nothing       write rows + ledger entries
//!              written), ServiceError::Rule         │
//!                                                   ▼
//!                                          commit() ──► info!, record out
//! ```
//!
//! Phase resolution always uses the injected `Clock`, read inside the
//! transaction.

mod artisan;
mod event;
mod exchange;
mod inventory;
mod product;
mod report;
mod sale;

#[cfg(test)]
pub(crate) mod testing;

pub use sale::MultiSaleError;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use feria_core::validation::require_found;
use feria_core::{Clock, CoreError, Event, EventPhase, SystemClock};

use crate::config::{FairSettings, FeriaConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::pool::Database;

/// Entry point for callers: holds the database, the clock and fair
/// defaults.
///
/// ## Usage
/// ```rust,ignore
/// let services = Services::new(db, Arc::new(SystemClock), FairSettings::default());
/// let created = services.create_sale(new_sale).await?;
/// ```
#[derive(Clone)]
pub struct Services {
    db: Database,
    clock: Arc<dyn Clock>,
    fair: FairSettings,
}

impl Services {
    pub fn new(db: Database, clock: Arc<dyn Clock>, fair: FairSettings) -> Self {
        Services { db, clock, fair }
    }

    /// Opens the configured database and uses the system clock.
    pub async fn from_config(config: &FeriaConfig) -> ServiceResult<Self> {
        let db = Database::new(config.database.to_db_config()).await?;
        Ok(Services::new(db, Arc::new(SystemClock), config.fair.clone()))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Phase of `event` right now.
    pub fn resolve_event_phase(&self, event: &Event) -> EventPhase {
        event.phase_at(self.now())
    }
}

/// Logs a rejected operation and wraps the rule failure.
pub(crate) fn rejected(operation: &'static str, err: CoreError) -> ServiceError {
    warn!(operation, error = %err, "Operation rejected");
    ServiceError::Rule(err)
}

/// Unwraps a lookup or rejects the operation with `NotFound`.
pub(crate) fn found<T>(operation: &'static str, record: Option<T>, entity: &str, id: &str) -> ServiceResult<T> {
    require_found(record, entity, id).map_err(|e| rejected(operation, e))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
