//! # till-core
//!
//! Cart pricing, GST extraction, tender rules and report aggregation for
//! Till POS. Nothing in here touches a database or a clock it was not given.
//!
//! ## Where It Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation layer (external)                   │   │
//! │  │      Scan ──► Cart view ──► Tender form ──► Receipt             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             till-checkout (session, finalizer)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ totals  │ │  cart   │ │ tender  │ │ report  │  │   │
//! │  │   │ Money   │ │ GST     │ │ Cart    │ │ cash    │ │ daily   │  │   │
//! │  │   │ TaxRate │ │ extract │ │LineItem │ │ eft     │ │ hourly  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ │ split   │ └─────────┘  │   │
//! │  │                                        └─────────┘              │   │
//! │  │   deterministic: same cart + same tender ⇒ same sale            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-db (SQLite repositories)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - integer cents, amount parsing, GST extraction
//! - [`types`] - products, cart lines, sales and tenders
//! - [`totals`] - subtotal / tax / total for a set of lines
//! - [`cart`] - the mutable cart, recomputed after every change
//! - [`tender`] - cash, EFT and split tender rules
//! - [`report`] - daily and period summaries over completed sales
//! - [`error`], [`validation`] - refusal types and field checks
//!
//! ## Example
//!
//! ```rust
//! use till_core::money::Money;
//! use till_core::types::TaxRate;
//!
//! // Prices already include GST; the tax is extracted, never added.
//! let price = Money::from_cents(11000); // $110.00
//! let gst = TaxRate::from_bps(1000); // 10%
//!
//! assert_eq!(price.included_tax(gst).cents(), 1000); // $10.00
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod report;
pub mod tender;
pub mod totals;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartView};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tender::{validate_tender, TenderInput};
pub use totals::{compute_totals, CartTotals};
pub use types::*;

// =============================================================================
// Limits
// =============================================================================

/// Default GST rate in basis points (10%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// Distinct lines one cart may hold.
pub const MAX_CART_ITEMS: usize = 100;

/// Largest quantity one cart line may hold.
pub const MAX_ITEM_QUANTITY: i64 = 999;
