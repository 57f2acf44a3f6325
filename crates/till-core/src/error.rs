//! # Cart and Tender Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError                         raised by                            │
//! │  ├── ProductNotFound               session lookups                      │
//! │  ├── InsufficientStock             Cart::add_item / update_quantity     │
//! │  ├── CartTooLarge                  Cart::add_item (new line)            │
//! │  ├── QuantityTooLarge              Cart::add_item / update_quantity     │
//! │  ├── EmptyCart                     SaleFinalizer::finalize              │
//! │  └── Validation ─┐                                                      │
//! │                  ▼                                                      │
//! │  ValidationError                   validation::*, validate_tender,     │
//! │                                    Money::parse_amount                  │
//! │                                                                         │
//! │  till-db adds DbError; till-checkout adds StoreError, CheckoutError    │
//! │  and the ApiError the screen receives.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are written for the cashier: they name the product or the field
//! and carry the amounts involved.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// A cart operation that was refused. The cart is unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown id or barcode, or a soft-deleted product.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The line would hold more units than were last seen on the shelf.
    /// `available` is the line's `known_stock`, refreshed by the session.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A new line was refused because the cart already has `max` lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A field the cashier typed, or a catalog field, failed a check.
///
/// Tender validation reports through this type as well: an unparseable amount
/// and an insufficient amount are both a `ValidationError`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Unparseable amount, or a barcode with stray characters.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Tendered amount does not cover what is owed.
    #[error("{field} of {offered} must be equal to or greater than {required}")]
    InsufficientAmount {
        field: String,
        required: Money,
        offered: Money,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
