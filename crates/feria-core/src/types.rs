//! # Domain Types
//!
//! Records and enums of the craft-fair sales core.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                 │
//! │  │   Event     │◄───│   Product   │───►│   Artisan   │                 │
//! │  │  (fair)     │    │  price      │    │ identific.  │                 │
//! │  └─────────────┘    └──────▲──────┘    └─────────────┘                 │
//! │                            │ product_id                                 │
//! │  ┌─────────────┐    ┌──────┴──────────────┐    ┌─────────────────┐     │
//! │  │    Sale     │◄───│  InventoryMovement  │───►│  ProductChange  │     │
//! │  │ ACTIVE ...  │    │  IN / OUT, quantity │    │  (exchange)     │     │
//! │  └─────────────┘    └─────────────────────┘    └─────────────────┘     │
//! │        sale_id ◄──── at most one of ────► change_id                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All relations are one-directional foreign keys held as id strings;
//! traversal always goes through the storage layer by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{CommissionRate, Money};
use crate::phase::{self, EventPhase};

// =============================================================================
// Event
// =============================================================================

/// A fair. Its lifecycle phase is derived from the dates and the explicit
/// closed flag, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub location: String,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    /// Association commission in basis points.
    pub commission_association_bps: u32,
    /// Seller commission in basis points.
    pub commission_seller_bps: u32,
    /// Set by `close_event`; overrides the date window.
    pub closed: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Resolves the lifecycle phase at `now`.
    #[inline]
    pub fn phase_at(&self, now: DateTime<Utc>) -> EventPhase {
        phase::resolve(self, now)
    }

    #[inline]
    pub fn association_rate(&self) -> CommissionRate {
        CommissionRate::from_bps(self.commission_association_bps)
    }

    #[inline]
    pub fn seller_rate(&self) -> CommissionRate {
        CommissionRate::from_bps(self.commission_seller_bps)
    }
}

// =============================================================================
// Artisan
// =============================================================================

/// A member artisan who owns products and receives sale payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Artisan {
    pub id: String,
    pub name: String,
    /// National id or tax number; unique across artisans.
    pub identification: String,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product offered by one artisan at one fair.
///
/// There is deliberately no stock field: stock is always the signed sum of
/// the product's ledger movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Unit price in cents.
    pub price_cents: i64,
    pub event_id: String,
    pub artisan_id: String,
    pub category: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum MovementType {
    /// Stock enters (stocking, cancellation, exchange return).
    In,
    /// Stock leaves (sale, exchange delivery).
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub movement_type: MovementType,
    /// Always positive; the direction comes from `movement_type`.
    pub quantity: i64,
    pub reason: String,
    pub product_id: String,
    pub sale_id: Option<String>,
    pub change_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Contribution of this entry to the product's stock.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        match self.movement_type {
            MovementType::In => self.quantity,
            MovementType::Out => -self.quantity,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    /// Card payment; the processor fee must be recorded.
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Lifecycle of a sale.
///
/// ```text
/// (none) ──create──► ACTIVE ──exchange (full qty)──► CHANGED
///                       │
///                       └──────cancel──────────────► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum SaleState {
    Active,
    Changed,
    Cancelled,
}

impl SaleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleState::Active => "ACTIVE",
            SaleState::Changed => "CHANGED",
            SaleState::Cancelled => "CANCELLED",
        }
    }

    /// CHANGED and CANCELLED accept no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SaleState::Active)
    }
}

impl Default for SaleState {
    fn default() -> Self {
        SaleState::Active
    }
}

impl fmt::Display for SaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered sale of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub event_id: String,
    pub product_id: String,
    pub artisan_id: String,
    pub quantity_sold: i64,
    /// Amount actually collected, in cents. May differ from price × quantity.
    pub value_charged_cents: i64,
    pub payment_method: PaymentMethod,
    /// Processor fee in cents; present iff the payment method is CARD.
    pub card_fee_cents: Option<i64>,
    pub state: SaleState,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn value_charged(&self) -> Money {
        Money::from_cents(self.value_charged_cents)
    }

    #[inline]
    pub fn card_fee(&self) -> Money {
        Money::from_cents(self.card_fee_cents.unwrap_or(0))
    }
}

// =============================================================================
// Product Change (exchange)
// =============================================================================

/// A post-sale swap of sold units for units of another product of equal or
/// greater value. At most one per sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductChange {
    pub id: String,
    pub sale_id: String,
    pub product_returned_id: String,
    pub product_delivered_id: String,
    pub quantity: i64,
    /// Delivered product's unit price at exchange time.
    pub delivered_product_price_cents: i64,
    /// (delivered − returned price) × quantity; never negative.
    pub value_difference_cents: i64,
    pub payment_method_difference: Option<PaymentMethod>,
    pub card_fee_difference_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ProductChange {
    #[inline]
    pub fn value_difference(&self) -> Money {
        Money::from_cents(self.value_difference_cents)
    }

    #[inline]
    pub fn card_fee_difference(&self) -> Money {
        Money::from_cents(self.card_fee_difference_cents.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
