//! # feria-core: Pure Business Logic for Feria
//!
//! This crate holds every rule of the craft-fair sales core as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Feria Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          HTTP controllers / PDF export / admin UI               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain records, typed errors            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               feria-db (services, ledger, SQLite)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ feria-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   phase   │  │ validation│  │   │
//! │  │   │  Event    │  │   Money   │  │  resolver │  │   rules   │  │   │
//! │  │   │  Sale ... │  │ proration │  │  gating   │  │  runner   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Event, Artisan, Product, Sale, ...)
//! - [`money`] - Integer money, commission rates, fee proration
//! - [`phase`] - Event lifecycle resolution, gating table, injected clock
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Precondition checks and the rule runner
//! - [`dto`] - Service inputs, filters and read models
//! - [`settlement`] - Per-artisan payout report
//!
//! ## Example Usage
//!
//! ```rust
//! use feria_core::money::{prorate_fee, Money};
//!
//! let shares = prorate_fee(
//!     Money::from_cents(1500),
//!     &[Money::from_cents(20000), Money::from_cents(10000)],
//! );
//! assert_eq!(shares, vec![Money::from_cents(1000), Money::from_cents(500)]);
//! ```

pub mod dto;
pub mod error;
pub mod money;
pub mod phase;
pub mod settlement;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{CommissionRate, Money};
pub use phase::{Clock, EventPhase, FixedClock, GatedAction, SystemClock};
pub use types::*;
pub use validation::Rules;

/// Reason recorded on the OUT movement written by a direct sale.
pub const REASON_DIRECT_SALE: &str = "direct sale";

/// Reason recorded on the IN movement compensating a cancelled sale.
pub const REASON_SALE_CANCELLATION: &str = "sale cancellation";

/// Reason recorded on the IN movement for the returned side of an exchange.
pub const REASON_EXCHANGE_RETURN: &str = "return from exchange";

/// Reason recorded on the OUT movement for the delivered side of an exchange.
pub const REASON_EXCHANGE_DELIVERY: &str = "delivery from exchange";

/// Reason recorded when a product is created with an opening quantity.
pub const REASON_INITIAL_STOCK: &str = "initial stock";

/// Maximum length of free-text names (event, product, artisan, location).
pub const MAX_NAME_LENGTH: usize = 200;
