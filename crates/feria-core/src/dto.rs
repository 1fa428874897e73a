//! # Request and View Types
//!
//! Inputs accepted by the service layer, list filters, and the read models it
//! hands back to controllers. Everything here is a plain record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::phase::EventPhase;
use crate::types::{
    Event, MovementType, PaymentMethod, Product, Sale, SaleState,
};

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewEvent {
    pub name: String,
    pub location: String,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    /// Falls back to the configured default when absent.
    pub commission_association_bps: Option<u32>,
    /// Falls back to the configured default when absent.
    pub commission_seller_bps: Option<u32>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
    pub commission_association_bps: Option<u32>,
    pub commission_seller_bps: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub phase: Option<EventPhase>,
}

/// An event together with its phase as of the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventView {
    pub event: Event,
    pub phase: EventPhase,
}

// =============================================================================
// Artisans
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewArtisan {
    pub name: String,
    pub identification: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub event_id: String,
    pub artisan_id: String,
    pub category: String,
    /// Opening quantity, written as an IN movement with the product.
    pub initial_stock: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub event_id: Option<String>,
    pub artisan_id: Option<String>,
    pub category: Option<String>,
}

/// A product with its ledger-derived stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductView {
    pub product: Product,
    pub stock: i64,
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMovement {
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub sale_id: Option<String>,
    pub change_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub event_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub sale_id: Option<String>,
    pub change_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockTotals {
    pub total_in: i64,
    pub total_out: i64,
}

impl StockTotals {
    #[inline]
    pub fn stock(&self) -> i64 {
        self.total_in - self.total_out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    pub product_id: String,
    pub total_in: i64,
    pub total_out: i64,
    pub stock: i64,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub event_id: String,
    pub product_id: String,
    pub artisan_id: String,
    pub quantity: i64,
    pub value_charged_cents: i64,
    pub payment_method: PaymentMethod,
    pub card_fee_cents: Option<i64>,
}

/// A committed sale plus `price × quantity` for display.
///
/// `total_amount_cents` is a convenience figure; `sale.value_charged_cents`
/// is what was actually collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatedSale {
    pub sale: Sale,
    pub total_amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MultiSaleItem {
    pub product_id: String,
    pub artisan_id: String,
    pub quantity: i64,
}

/// A basket checked out with one payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMultiSale {
    pub event_id: String,
    pub payment_method: PaymentMethod,
    /// Processor fee for the whole basket; prorated across items.
    pub card_fee_total_cents: Option<i64>,
    pub items: Vec<MultiSaleItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub event_id: Option<String>,
    pub artisan_id: Option<String>,
    pub product_id: Option<String>,
    pub state: Option<SaleState>,
    pub payment_method: Option<PaymentMethod>,
}

// =============================================================================
// Exchanges
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExchange {
    pub sale_id: String,
    pub product_returned_id: String,
    pub product_delivered_id: String,
    pub quantity: i64,
    pub payment_method_difference: Option<PaymentMethod>,
    pub card_fee_difference_cents: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeFilter {
    pub sale_id: Option<String>,
    pub event_id: Option<String>,
    /// Matches either the returned or the delivered product.
    pub product_id: Option<String>,
}

// =============================================================================
// Settlement
// =============================================================================

/// Per-artisan payout figures for one event, in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ArtisanSettlement {
    pub artisan_id: String,
    pub artisan_name: String,
    pub units_sold: i64,
    pub gross_sales_cents: i64,
    pub card_fees_cents: i64,
    pub association_commission_cents: i64,
    pub seller_commission_cents: i64,
    pub net_payout_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventSettlement {
    pub event_id: String,
    pub phase: EventPhase,
    pub lines: Vec<ArtisanSettlement>,
    pub total_gross_cents: i64,
    pub total_card_fees_cents: i64,
    pub total_association_commission_cents: i64,
    pub total_seller_commission_cents: i64,
    pub total_net_payout_cents: i64,
}
