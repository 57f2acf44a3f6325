//! # Money
//!
//! Whole cents in an `i64`. Line totals, subtotals and tenders are exact
//! integer sums; the only division anywhere in checkout is GST extraction,
//! and it rounds once.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Where Money flows                                                     │
//! │                                                                         │
//! │  Product.price_cents ──► LineItem.unit_price ──► LineItem.line_total   │
//! │                                                       │                 │
//! │                          Cart.subtotal = Σ line_total ┘                 │
//! │                               │                                         │
//! │                               ├──► included GST    (extracted, rounded) │
//! │                               └──► total ──► tender ──► change          │
//! │                                                                         │
//! │  Tender text ("42.50", "$7", ".5") ──► parse_amount ──► Money           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use till_core::money::Money;
//!
//! let flat_white = Money::from_cents(450);
//! let order = flat_white * 2 + Money::from_cents(650);
//! assert_eq!(order.to_string(), "$15.50");
//!
//! let tendered = Money::parse_amount("cash amount", "20").unwrap();
//! assert_eq!(tendered.saturating_remainder(order).cents(), 450);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

const CENTS_PER_UNIT: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// An amount in cents.
///
/// Signed so that a negative tender survives parsing and can be refused by
/// the tender rules with a message naming the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Dollars and cents. The sign of `dollars` applies to the whole
    /// amount, so `from_major_minor(-3, 25)` is `-$3.25`.
    #[inline]
    pub const fn from_major_minor(dollars: i64, cents: i64) -> Self {
        let magnitude = dollars.abs() * CENTS_PER_UNIT + cents;
        Money(if dollars < 0 { -magnitude } else { magnitude })
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the difference, floored at zero.
    ///
    /// Used for change (`paid - total`) and for the derived EFT portion of a
    /// split tender (`total - cash`).
    #[inline]
    pub fn saturating_remainder(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Extracts the tax already contained in a tax-inclusive amount.
    ///
    /// ## Formula
    /// ```text
    /// tax = amount × r / (1 + r)
    ///     = amount_cents × bps / (10000 + bps)      (integer form)
    /// ```
    /// The division is done in `i128` and rounded once to the nearest cent,
    /// halves away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::types::TaxRate;
    ///
    /// let gst = TaxRate::from_bps(1000); // 10%
    ///
    /// // $110.00 inclusive of 10% GST contains exactly $10.00 of GST
    /// assert_eq!(Money::from_cents(11000).included_tax(gst).cents(), 1000);
    ///
    /// // $30.00 contains $2.7272.. of GST, shown as $2.73
    /// assert_eq!(Money::from_cents(3000).included_tax(gst).cents(), 273);
    /// ```
    pub fn included_tax(&self, rate: TaxRate) -> Money {
        if rate.is_zero() {
            return Money::zero();
        }

        let numerator = self.0 as i128 * rate.bps() as i128;
        let denominator = 10_000_i128 + rate.bps() as i128;
        let rounded = (numerator.abs() * 2 + denominator) / (denominator * 2);
        let signed = if numerator < 0 { -rounded } else { rounded };

        Money::from_cents(signed as i64)
    }

    /// Line total for `qty` units at this unit price.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Parses an amount typed by the cashier.
    ///
    /// ## Accepted Input
    /// - Digits with an optional decimal point and at most two decimals:
    ///   `"42"`, `"42.5"`, `"42.50"`, `".50"`
    /// - Optional leading `$` and surrounding whitespace
    /// - Optional leading `-` (the result is negative; callers reject it)
    ///
    /// Anything else is a [`ValidationError`] naming `field`.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::parse_amount("cash", " $42.5 ").unwrap().cents(), 4250);
    /// assert!(Money::parse_amount("cash", "forty").is_err());
    /// assert!(Money::parse_amount("cash", "1.005").is_err());
    /// ```
    pub fn parse_amount(field: &str, input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let unsigned = unsigned.strip_prefix('$').unwrap_or(unsigned);
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(invalid("must be a valid number"));
        }

        if fraction.len() > 2 {
            return Err(invalid("must have at most two decimal places"));
        }

        let major: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("is too large"))?
        };
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("must be a valid number"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("must be a valid number"))?,
        };

        let cents = major
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// `$12.30`, `-$0.05`. The currency symbol on receipts comes from
/// `CheckoutConfig::format_currency` instead.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_unit = CENTS_PER_UNIT as u64;
        write!(f, "{sign}${}.{:02}", magnitude / per_unit, magnitude % per_unit)
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

impl std::iter::Sum for Money {
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

    #[test]
    fn test_display_formats_sign_and_cents() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
        assert_eq!(Money::from_cents(-1250).to_string(), "-$12.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(42, 50).cents(), 4250);
        assert_eq!(Money::from_major_minor(0, 5).cents(), 5);
        assert_eq!(Money::from_major_minor(-3, 25).cents(), -325);
    }

    #[test]
    fn test_operators_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let sum: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(sum.cents(), 2000);
    }

    #[test]
    fn test_saturating_remainder() {
        let total = Money::from_cents(10000);
        assert_eq!(total.saturating_remainder(Money::from_cents(6000)).cents(), 4000);
        assert_eq!(total.saturating_remainder(Money::from_cents(12000)).cents(), 0);
    }

    #[test]
    fn test_included_tax_exact() {
        let gst = TaxRate::from_bps(1000);
        assert_eq!(Money::from_cents(11000).included_tax(gst).cents(), 1000);
        assert_eq!(Money::from_cents(110).included_tax(gst).cents(), 10);
    }

    #[test]
    fn test_included_tax_rounds_once() {
        let gst = TaxRate::from_bps(1000);
        // 3000 × 1000 / 11000 = 272.72..
        assert_eq!(Money::from_cents(3000).included_tax(gst).cents(), 273);
        // 1 × 1000 / 11000 = 0.09..
        assert_eq!(Money::from_cents(1).included_tax(gst).cents(), 0);
        // 55 × 1000 / 11000 = 5.0 exactly
        assert_eq!(Money::from_cents(55).included_tax(gst).cents(), 5);
    }

    #[test]
    fn test_included_tax_zero_rate() {
        let amount = Money::from_cents(4250);
        assert_eq!(amount.included_tax(TaxRate::zero()), Money::zero());
    }

    #[test]
    fn test_parse_amount_forms() {
        let parse = |s| Money::parse_amount("amount", s).map(|m| m.cents());
        assert_eq!(parse("42.50").unwrap(), 4250);
        assert_eq!(parse("42.5").unwrap(), 4250);
        assert_eq!(parse("42").unwrap(), 4200);
        assert_eq!(parse("42.").unwrap(), 4200);
        assert_eq!(parse(".5").unwrap(), 50);
        assert_eq!(parse("$7.05").unwrap(), 705);
        assert_eq!(parse("  0.00 ").unwrap(), 0);
        assert_eq!(parse("-5.00").unwrap(), -500);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(
            Money::parse_amount("amount", ""),
            Err(ValidationError::Required { .. })
        ));
        for input in ["abc", ".", "4,50", "1e3", "12.345", "--1", "4 2"] {
            assert!(
                matches!(
                    Money::parse_amount("amount", input),
                    Err(ValidationError::InvalidFormat { .. })
                ),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_parse_amount_overflow() {
        assert!(Money::parse_amount("amount", "99999999999999999999").is_err());
    }
}
