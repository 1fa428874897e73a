//! # Money Module
//!
//! Integer money, commission rates and payment-fee proration.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices, charged values, card fees and exchange differences are all    │
//! │  stored as whole minor units (cents). A fee of 15.00 split over two    │
//! │  items worth 200.00 and 100.00 becomes 1000 + 500 cents, and any      │
//! │  rounding remainder is assigned explicitly instead of vanishing.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use feria_core::money::{CommissionRate, Money};
//!
//! let price = Money::from_cents(2500);
//! let line = price.checked_times(3).unwrap();
//! assert_eq!(line.cents(), 7500);
//!
//! let association = line.percent_of(CommissionRate::from_bps(1000));
//! assert_eq!(association.cents(), 750);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that differences (delivered − returned price) can be computed
/// before the exchange rules reject negative results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use feria_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity; `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use feria_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_times(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_times(2), None);
    /// ```
    #[inline]
    pub const fn checked_times(&self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Applies a commission rate, rounding half up.
    ///
    /// Uses i128 for the intermediate product so large totals cannot overflow.
    pub fn percent_of(&self, rate: CommissionRate) -> Money {
        let scaled = self.0 as i128 * rate.bps() as i128;
        let rounded = if scaled >= 0 {
            (scaled + 5000) / 10000
        } else {
            (scaled - 5000) / 10000
        };
        Money(rounded as i64)
    }
}

// =============================================================================
// Fee Proration
// =============================================================================

/// Splits a combined payment-processor fee across basket items.
///
/// Each item receives `floor(total × weight_i / Σweight)`; whatever is left
/// over after flooring goes to the last item, so the shares always add up to
/// `total` exactly.
///
/// ## Example
/// ```text
/// items valued 200.00 and 100.00, card fee 15.00
///
///   share_1 = 1500 × 20000 / 30000 = 1000
///   share_2 = 1500 × 10000 / 30000 =  500
///   remainder = 0
/// ```
pub fn prorate_fee(total: Money, weights: &[Money]) -> Vec<Money> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weight_sum: i128 = weights.iter().map(|w| w.cents() as i128).sum();

    let mut shares: Vec<Money> = weights
        .iter()
        .map(|w| {
            if weight_sum == 0 {
                Money::zero()
            } else {
                Money((total.cents() as i128 * w.cents() as i128 / weight_sum) as i64)
            }
        })
        .collect();

    let allocated: Money = shares.iter().copied().sum();
    if let Some(last) = shares.last_mut() {
        *last += total - allocated;
    }

    shares
}

// =============================================================================
// Commission Rate
// =============================================================================

/// A percentage expressed in basis points (10000 = 100%).
///
/// Events carry two of these: the association's cut and the seller's cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// 100%.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        CommissionRate(bps)
    }

    /// Creates a rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        CommissionRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        CommissionRate(0)
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        CommissionRate::zero()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display; the UI layer does localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(values: &[i64]) -> Vec<Money> {
        values.iter().map(|c| Money::from_cents(*c)).collect()
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!(a.checked_times(4), Some(Money::from_cents(4000)));
        assert_eq!(Money::from_cents(i64::MAX).checked_times(2), None);
        assert_eq!(cents(&[1, 2, 3]).into_iter().sum::<Money>().cents(), 6);
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        let amount = Money::from_cents(1005);
        // 1005 × 5% = 50.25 → 50
        assert_eq!(amount.percent_of(CommissionRate::from_bps(500)).cents(), 50);
        // 1010 × 5% = 50.5 → 51
        assert_eq!(
            Money::from_cents(1010)
                .percent_of(CommissionRate::from_bps(500))
                .cents(),
            51
        );
        assert!(amount.percent_of(CommissionRate::zero()).is_zero());
    }

    #[test]
    fn test_prorate_exact_split() {
        let shares = prorate_fee(Money::from_cents(1500), &cents(&[20000, 10000]));
        assert_eq!(shares, cents(&[1000, 500]));
    }

    #[test]
    fn test_prorate_remainder_goes_to_last_item() {
        let shares = prorate_fee(Money::from_cents(100), &cents(&[1, 1, 1]));
        assert_eq!(shares, cents(&[33, 33, 34]));
        assert_eq!(shares.iter().copied().sum::<Money>().cents(), 100);
    }

    #[test]
    fn test_prorate_edge_cases() {
        assert!(prorate_fee(Money::from_cents(100), &[]).is_empty());

        let shares = prorate_fee(Money::from_cents(90), &cents(&[0, 0]));
        assert_eq!(shares, cents(&[0, 90]));

        let shares = prorate_fee(Money::zero(), &cents(&[500, 700]));
        assert_eq!(shares, cents(&[0, 0]));
    }

    #[test]
    fn test_commission_rate_from_percentage() {
        let rate = CommissionRate::from_percentage(12.5);
        assert_eq!(rate.bps(), 1250);
        assert!((rate.percentage() - 12.5).abs() < 0.001);
    }
}
