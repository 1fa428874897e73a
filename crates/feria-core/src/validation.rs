//! # Validation Module
//!
//! Field validators and the precondition checks every workflow runs before
//! it writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Field validators (validate_*)                                │
//! │  ├── Required text, lengths, positive quantities                       │
//! │  └── Run on raw input, no records needed                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Rule checks (require_*) composed into `Rules`                │
//! │  ├── Existence, phase gating, stock sufficiency                        │
//! │  ├── Cross-entity consistency, quantity bounds, value direction        │
//! │  └── Payment coherence, duplicate prevention, exclusivity              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints                                                 │
//! │  └── UNIQUE indexes                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each workflow assembles an ordered `Rules` list from the records it
//! loaded inside its transaction. `Rules::run` stops at the first failure
//! and returns that failure's own variant.
//!
//! ## Usage
//! ```rust
//! use feria_core::validation::{require_stock, validate_quantity, Rules};
//!
//! let result = Rules::new()
//!     .check(|| Ok(validate_quantity(2)?))
//!     .check(|| require_stock("p-1", 1, 2))
//!     .run();
//! assert!(result.is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{CommissionRate, Money};
use crate::types::{Artisan, PaymentMethod, Product, ProductChange, Sale, SaleState};
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Rule Runner
// =============================================================================

/// An ordered list of checks evaluated lazily, first failure wins.
#[derive(Default)]
pub struct Rules<'a> {
    checks: Vec<Box<dyn FnOnce() -> CoreResult<()> + 'a>>,
}

impl<'a> Rules<'a> {
    pub fn new() -> Self {
        Rules { checks: Vec::new() }
    }

    /// Appends a check; it only runs if every earlier check passed.
    pub fn check(mut self, check: impl FnOnce() -> CoreResult<()> + 'a) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn run(self) -> CoreResult<()> {
        for check in self.checks {
            check()?;
        }
        Ok(())
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required free-text field.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `MAX_NAME_LENGTH` characters
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a unit quantity (ledger entries, sales, exchanges).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents (prices, charged values, fees).
///
/// ## Example
/// ```rust
/// use feria_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("price", 1099).is_ok());
/// assert!(validate_amount_cents("price", 0).is_ok());
/// assert!(validate_amount_cents("price", -100).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a commission rate in basis points (0% to 100%).
pub fn validate_commission_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > CommissionRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: CommissionRate::MAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates an event window: start strictly before end.
pub fn validate_event_window(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<()> {
    if start >= end {
        return Err(ValidationError::MustPrecede {
            field: "start_date".to_string(),
            other: "end_date".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Rule Checks
// =============================================================================

/// Unwraps a lookup result or reports `NotFound`.
pub fn require_found<T>(record: Option<T>, entity: &str, id: &str) -> CoreResult<T> {
    record.ok_or_else(|| CoreError::not_found(entity, id))
}

pub fn require_sale_active(sale: &Sale) -> CoreResult<()> {
    if sale.state != SaleState::Active {
        return Err(CoreError::invalid_state(
            "Sale",
            &sale.id,
            SaleState::Active.as_str(),
            sale.state.as_str(),
        ));
    }
    Ok(())
}

pub fn require_artisan_active(artisan: &Artisan) -> CoreResult<()> {
    if !artisan.active {
        return Err(CoreError::invalid_state(
            "Artisan",
            &artisan.id,
            "active",
            "inactive",
        ));
    }
    Ok(())
}

/// Stock sufficiency: `available >= requested` before any OUT write.
pub fn require_stock(product_id: &str, available: i64, requested: i64) -> CoreResult<()> {
    if available < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// The product must belong to the given event and artisan.
pub fn require_product_context(product: &Product, event_id: &str, artisan_id: &str) -> CoreResult<()> {
    if product.event_id != event_id {
        return Err(CoreError::mismatch(format!(
            "product {} belongs to event {}, not {}",
            product.id, product.event_id, event_id
        )));
    }
    if product.artisan_id != artisan_id {
        return Err(CoreError::mismatch(format!(
            "product {} belongs to artisan {}, not {}",
            product.id, product.artisan_id, artisan_id
        )));
    }
    Ok(())
}

/// Both sides of an exchange are distinct and share the sale's event and
/// artisan.
pub fn require_exchange_products(sale: &Sale, returned: &Product, delivered: &Product) -> CoreResult<()> {
    if returned.id == delivered.id {
        return Err(CoreError::mismatch(
            "returned and delivered product must be different",
        ));
    }
    require_product_context(returned, &sale.event_id, &sale.artisan_id)?;
    require_product_context(delivered, &sale.event_id, &sale.artisan_id)
}

/// At most one exchange per sale.
pub fn require_no_exchange(existing: Option<&ProductChange>, sale_id: &str) -> CoreResult<()> {
    match existing {
        Some(change) => Err(CoreError::duplicate(format!(
            "sale {} already has exchange {}",
            sale_id, change.id
        ))),
        None => Ok(()),
    }
}

/// Exchange quantity cannot exceed what the sale sold.
pub fn require_within_sold(quantity: i64, sale: &Sale) -> CoreResult<()> {
    if quantity > sale.quantity_sold {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: sale.quantity_sold,
        }
        .into());
    }
    Ok(())
}

/// `price × quantity`, or `OutOfRange` when the amount does not fit in cents.
///
/// ## Example
/// ```rust
/// use feria_core::money::Money;
/// use feria_core::validation::line_total;
///
/// assert_eq!(line_total("total_amount", Money::from_cents(1800), 2).unwrap().cents(), 3600);
/// assert!(line_total("total_amount", Money::from_cents(i64::MAX), 2).is_err());
/// ```
pub fn line_total(field: &str, price: Money, quantity: i64) -> ValidationResult<Money> {
    price.checked_times(quantity).ok_or_else(|| ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

/// Computes `(delivered − returned) × quantity`, rejecting downgrades.
pub fn exchange_value_difference(returned_price: Money, delivered_price: Money, quantity: i64) -> CoreResult<Money> {
    let difference = line_total("value_difference", delivered_price - returned_price, quantity)?;
    if difference.is_negative() {
        return Err(CoreError::DowngradeNotAllowed {
            value_difference: difference.cents(),
        });
    }
    Ok(difference)
}

/// CARD needs a fee; CASH cannot carry a positive fee.
pub fn require_payment_coherence(method: PaymentMethod, fee_cents: Option<i64>) -> CoreResult<()> {
    if let Some(fee) = fee_cents {
        validate_amount_cents("card_fee", fee)?;
    }
    match (method, fee_cents) {
        (PaymentMethod::Card, None) => Err(CoreError::payment("card payments require a card fee")),
        (PaymentMethod::Cash, Some(fee)) if fee > 0 => {
            Err(CoreError::payment("cash payments cannot carry a card fee"))
        }
        _ => Ok(()),
    }
}

/// For the exchange difference: a fee is required with CARD and forbidden
/// otherwise.
pub fn require_exchange_payment_coherence(method: Option<PaymentMethod>, fee_cents: Option<i64>) -> CoreResult<()> {
    if let Some(fee) = fee_cents {
        validate_amount_cents("card_fee_difference", fee)?;
    }
    match (method, fee_cents) {
        (Some(PaymentMethod::Card), None) => Err(CoreError::payment(
            "card payment of the difference requires a card fee",
        )),
        (Some(PaymentMethod::Card), Some(_)) => Ok(()),
        (_, Some(_)) => Err(CoreError::payment(
            "card fee difference requires the difference to be paid by card",
        )),
        (_, None) => Ok(()),
    }
}

/// A movement references a sale or an exchange, never both.
pub fn require_exclusive_reference(sale_id: Option<&str>, change_id: Option<&str>) -> CoreResult<()> {
    if sale_id.is_some() && change_id.is_some() {
        return Err(ValidationError::MutuallyExclusive {
            field: "sale_id".to_string(),
            other: "change_id".to_string(),
        }
        .into());
    }
    Ok(())
}

/// At most one OUT movement per (product, sale).
pub fn require_no_duplicate_out(existing_out: i64, product_id: &str, sale_id: &str) -> CoreResult<()> {
    if existing_out > 0 {
        return Err(CoreError::duplicate(format!(
            "OUT movement for product {} and sale {} already exists",
            product_id, sale_id
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn product(id: &str, event_id: &str, artisan_id: &str, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("product {}", id),
            price_cents: price,
            event_id: event_id.to_string(),
            artisan_id: artisan_id.to_string(),
            category: "ceramics".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sale(quantity_sold: i64, state: SaleState) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s-1".to_string(),
            event_id: "e-1".to_string(),
            product_id: "p-1".to_string(),
            artisan_id: "a-1".to_string(),
            quantity_sold,
            value_charged_cents: 10000 * quantity_sold,
            payment_method: PaymentMethod::Cash,
            card_fee_cents: None,
            state,
            date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_rules_short_circuit() {
        let ran_third = Cell::new(false);
        let result = Rules::new()
            .check(|| Ok(()))
            .check(|| require_stock("p-1", 0, 1))
            .check(|| {
                ran_third.set(true);
                Ok(())
            })
            .run();

        assert!(matches!(result, Err(CoreError::InsufficientStock { .. })));
        assert!(!ran_third.get());
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("name", "Cerámica Andina").is_ok());
        assert!(validate_text("name", "   ").is_err());
        assert!(validate_text("name", &"A".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_event_window() {
        let start = Utc::now();
        assert!(validate_event_window(start, start + chrono::Duration::hours(1)).is_ok());
        assert!(validate_event_window(start, start).is_err());
    }

    #[test]
    fn test_validate_commission_bps() {
        assert!(validate_commission_bps("commission", 0).is_ok());
        assert!(validate_commission_bps("commission", 10000).is_ok());
        assert!(validate_commission_bps("commission", 10001).is_err());
    }

    #[test]
    fn test_require_stock() {
        assert!(require_stock("p-1", 5, 5).is_ok());
        assert_eq!(
            require_stock("p-1", 1, 2).unwrap_err(),
            CoreError::InsufficientStock {
                product_id: "p-1".to_string(),
                available: 1,
                requested: 2,
            }
        );
    }

    #[test]
    fn test_require_sale_active() {
        assert!(require_sale_active(&sale(1, SaleState::Active)).is_ok());
        assert!(matches!(
            require_sale_active(&sale(1, SaleState::Changed)),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_exchange_products_must_share_context() {
        let s = sale(2, SaleState::Active);
        let returned = product("p-1", "e-1", "a-1", 10000);

        assert!(require_exchange_products(&s, &returned, &product("p-2", "e-1", "a-1", 12000)).is_ok());
        assert!(matches!(
            require_exchange_products(&s, &returned, &returned),
            Err(CoreError::CrossEntityMismatch { .. })
        ));
        assert!(matches!(
            require_exchange_products(&s, &returned, &product("p-3", "e-2", "a-1", 12000)),
            Err(CoreError::CrossEntityMismatch { .. })
        ));
        assert!(matches!(
            require_exchange_products(&s, &returned, &product("p-4", "e-1", "a-9", 12000)),
            Err(CoreError::CrossEntityMismatch { .. })
        ));
    }

    #[test]
    fn test_within_sold() {
        let s = sale(3, SaleState::Active);
        assert!(require_within_sold(3, &s).is_ok());
        assert!(matches!(
            require_within_sold(4, &s),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_value_difference_floor() {
        let diff = exchange_value_difference(Money::from_cents(7000), Money::from_cents(10000), 2).unwrap();
        assert_eq!(diff.cents(), 6000);

        let equal = exchange_value_difference(Money::from_cents(7000), Money::from_cents(7000), 5).unwrap();
        assert!(equal.is_zero());

        for quantity in 1..=5 {
            assert_eq!(
                exchange_value_difference(Money::from_cents(10000), Money::from_cents(7000), quantity)
                    .unwrap_err(),
                CoreError::DowngradeNotAllowed {
                    value_difference: -3000 * quantity
                }
            );
        }
    }

    #[test]
    fn test_line_total_overflow() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);

        assert!(matches!(
            line_total("total_amount", huge, 2),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            exchange_value_difference(Money::zero(), huge, 2),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_payment_coherence() {
        assert!(require_payment_coherence(PaymentMethod::Card, Some(150)).is_ok());
        assert!(require_payment_coherence(PaymentMethod::Card, Some(0)).is_ok());
        assert!(require_payment_coherence(PaymentMethod::Cash, None).is_ok());
        assert!(require_payment_coherence(PaymentMethod::Cash, Some(0)).is_ok());

        assert!(matches!(
            require_payment_coherence(PaymentMethod::Card, None),
            Err(CoreError::PaymentCoherenceViolation { .. })
        ));
        assert!(matches!(
            require_payment_coherence(PaymentMethod::Cash, Some(100)),
            Err(CoreError::PaymentCoherenceViolation { .. })
        ));
        assert!(matches!(
            require_payment_coherence(PaymentMethod::Card, Some(-1)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_exchange_payment_coherence() {
        assert!(require_exchange_payment_coherence(None, None).is_ok());
        assert!(require_exchange_payment_coherence(Some(PaymentMethod::Cash), None).is_ok());
        assert!(require_exchange_payment_coherence(Some(PaymentMethod::Card), Some(50)).is_ok());

        assert!(require_exchange_payment_coherence(Some(PaymentMethod::Card), None).is_err());
        assert!(require_exchange_payment_coherence(Some(PaymentMethod::Cash), Some(50)).is_err());
        assert!(require_exchange_payment_coherence(None, Some(50)).is_err());
    }

    #[test]
    fn test_exclusive_reference_and_duplicates() {
        assert!(require_exclusive_reference(Some("s-1"), None).is_ok());
        assert!(require_exclusive_reference(None, Some("c-1")).is_ok());
        assert!(require_exclusive_reference(Some("s-1"), Some("c-1")).is_err());

        assert!(require_no_duplicate_out(0, "p-1", "s-1").is_ok());
        assert!(matches!(
            require_no_duplicate_out(1, "p-1", "s-1"),
            Err(CoreError::DuplicateOperation { .. })
        ));
    }
}
