//! # Cart Totals
//!
//! The money/tax calculator: turns line items into subtotal, included tax and
//! total under tax-inclusive pricing.
//!
//! ```text
//! subtotal = Σ quantity × unit_price      (exact, integer cents)
//! tax      = subtotal × r / (1 + r)       (rounded once, here)
//! total    = subtotal                     (tax is inside, never added)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{LineItem, TaxRate};

/// Derived totals of a cart or sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub subtotal: Money,
    /// GST contained in `subtotal`.
    pub tax: Money,
    pub total: Money,
}

/// Computes the totals for a sequence of line items.
///
/// Quantities must already be positive; the cart rejects anything else
/// before it gets here.
///
/// ```rust
/// use till_core::totals::compute_totals;
/// use till_core::types::TaxRate;
///
/// let totals = compute_totals(&[], TaxRate::from_bps(1000));
/// assert!(totals.total.is_zero());
/// ```
pub fn compute_totals(items: &[LineItem], rate: TaxRate) -> CartTotals {
    let subtotal: Money = items
        .iter()
        .map(|item| item.unit_price.multiply_quantity(item.quantity))
        .sum();

    CartTotals {
        subtotal,
        tax: subtotal.included_tax(rate),
        total: subtotal,
    }
}
