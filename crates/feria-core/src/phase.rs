//! # Event Phase
//!
//! Derives an event's lifecycle phase and decides which actions it permits.
//!
//! ## Resolution Rule
//! ```text
//! closed flag set ───────────────────────────────► CLOSED
//!
//!            start_date                end_date
//! ────────────────┼───────────────────────┼────────────────► now
//!    SCHEDULED    │        ACTIVE         │     CLOSED
//! ```
//!
//! ## Gating Table
//! ```text
//! ┌───────────┬─────────┬──────────┬───────────┬──────┬──────────┬───────┐
//! │ Phase     │ Create  │ Stock IN │ Stock OUT │ Sale │ Exchange │ Close │
//! │           │ Product │          │ / Cancel  │      │          │ Event │
//! ├───────────┼─────────┼──────────┼───────────┼──────┼──────────┼───────┤
//! │ SCHEDULED │   yes   │   yes    │    no     │  no  │    no    │  no   │
//! │ ACTIVE    │   no    │   no     │    yes    │ yes  │   yes    │  yes  │
//! │ CLOSED    │   no    │   no     │    no     │  no  │    no    │  no   │
//! └───────────┴─────────┴──────────┴───────────┴──────┴──────────┴───────┘
//! ```
//!
//! The result is only fresh at the moment it is computed; workflows resolve
//! the phase inside their own transaction and never cache it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Event;

// =============================================================================
// Phase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum EventPhase {
    /// Pre-fair setup: products and stock are loaded.
    Scheduled,
    /// Fair running: sales, exchanges and cancellations.
    Active,
    /// Terminal.
    Closed,
}

impl EventPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventPhase::Scheduled => "SCHEDULED",
            EventPhase::Active => "ACTIVE",
            EventPhase::Closed => "CLOSED",
        }
    }

    /// Looks the action up in the gating table.
    pub fn allows(&self, action: GatedAction) -> bool {
        *self == action.required_phase()
    }
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the phase of `event` at `now`.
pub fn resolve(event: &Event, now: DateTime<Utc>) -> EventPhase {
    if event.closed {
        return EventPhase::Closed;
    }
    if now < event.start_date {
        EventPhase::Scheduled
    } else if now > event.end_date {
        EventPhase::Closed
    } else {
        EventPhase::Active
    }
}

// =============================================================================
// Gated Actions
// =============================================================================

/// Every operation whose availability depends on the event phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedAction {
    CreateProduct,
    UpdateEvent,
    StockIn,
    StockOut,
    RegisterSale,
    CancelSale,
    Exchange,
    CloseEvent,
}

impl GatedAction {
    /// The single phase in which the action is permitted.
    pub fn required_phase(&self) -> EventPhase {
        match self {
            GatedAction::CreateProduct | GatedAction::UpdateEvent | GatedAction::StockIn => {
                EventPhase::Scheduled
            }
            GatedAction::StockOut
            | GatedAction::RegisterSale
            | GatedAction::CancelSale
            | GatedAction::Exchange
            | GatedAction::CloseEvent => EventPhase::Active,
        }
    }
}

/// Fails with `InvalidState` unless `event` permits `action` at `now`.
///
/// ## Returns
/// The resolved phase, so callers can log it.
pub fn require(event: &Event, now: DateTime<Utc>, action: GatedAction) -> CoreResult<EventPhase> {
    let phase = resolve(event, now);
    if phase.allows(action) {
        Ok(phase)
    } else {
        Err(CoreError::invalid_state(
            "Event",
            &event.id,
            action.required_phase().as_str(),
            phase.as_str(),
        ))
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for phase resolution and record timestamps.
///
/// Injected so tests can move an event through SCHEDULED → ACTIVE → CLOSED
/// deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        FixedClock {
            time: RwLock::new(time),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        match self.time.write() {
            Ok(mut guard) => *guard = time,
            Err(poisoned) => *poisoned.into_inner() = time,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.time.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
