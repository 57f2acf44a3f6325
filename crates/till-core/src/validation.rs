//! # Input Validation
//!
//! Checks shared by the cart, the tender rules and the catalog repository.
//! SQLite repeats the numeric ones as `CHECK` constraints; these run first
//! so the cashier gets a message naming the field.
//!
//! ```rust
//! use till_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("9300633000017").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_BARCODE_LEN: usize = 50;
pub const MAX_PRODUCT_NAME_LEN: usize = 200;
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

/// Basis points at which included-tax extraction stops making sense (100%).
const TAX_RATE_LIMIT_BPS: u32 = 10_000;

fn non_empty<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn at_most(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn at_least_zero(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Catalog Fields
// =============================================================================

/// EAN/UPC numbers and in-house codes: letters, digits and hyphens, at most
/// 50 characters.
///
/// ```rust
/// use till_core::validation::validate_barcode;
///
/// assert!(validate_barcode("9300633000017").is_ok());
/// assert!(validate_barcode("HOUSE-001").is_ok());
/// assert!(validate_barcode("93 00").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = non_empty("barcode", barcode)?;
    at_most("barcode", barcode, MAX_BARCODE_LEN)?;

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Non-blank, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = non_empty("name", name)?;
    at_most("name", name, MAX_PRODUCT_NAME_LEN)
}

/// Trims a catalog search. An empty query is allowed and lists every active
/// product.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    at_most("query", query, MAX_SEARCH_QUERY_LEN)?;
    Ok(query.to_string())
}

/// Zero is a valid price (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    at_least_zero("price", cents)
}

/// Stock set directly on a product. Deltas applied by sales are not checked.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    at_least_zero("stock", stock)
}

// =============================================================================
// Cart and Tax
// =============================================================================

/// A line quantity in `1..=MAX_ITEM_QUANTITY`.
///
/// ```text
/// qty <= 0   → MustBePositive
/// qty > 999  → OutOfRange { min: 1, max: 999 }
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Tax rates of 100% or more are rejected.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps >= TAX_RATE_LIMIT_BPS {
        return Err(ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: 0,
            max: i64::from(TAX_RATE_LIMIT_BPS - 1),
        });
    }
    Ok(())
}

/// Room for one more distinct line in a cart holding `current_items`.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
