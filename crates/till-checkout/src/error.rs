//! # Checkout Errors
//!
//! Error types for the session and finalizer, plus the [`ApiError`] the
//! presentation layer receives.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Till POS                               │
//! │                                                                         │
//! │  DbError ──────────► StoreError ──┐                                    │
//! │  (till-db)           NotFound      │                                    │
//! │                      Unavailable   ├──► CheckoutError ──► ApiError     │
//! │                      Rejected      │    Core            { code,        │
//! │                                    │    Validation        message }    │
//! │  CoreError ────────────────────────┘    Persistence                    │
//! │  ValidationError                        Store                          │
//! │                                                                         │
//! │  Stock update failures are NOT errors here: they travel in             │
//! │  StockOutcome::PendingReconciliation.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use till_core::{CoreError, ValidationError};
use till_db::DbError;

// =============================================================================
// Store Error
// =============================================================================

/// Failure reported by a [`ProductStore`](crate::store::ProductStore) or
/// [`SaleStore`](crate::store::SaleStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The store could not be reached or the operation did not complete.
    /// Worth retrying.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the operation. Retrying will not help.
    #[error("Rejected by store: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StoreError::NotFound(format!("{entity} {id}")),
            DbError::Validation(_)
            | DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::ConstraintViolation(_) => StoreError::Rejected(err.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Errors from session operations and [`SaleFinalizer::finalize`].
///
/// When finalize returns an error the cart is exactly as it was.
///
/// [`SaleFinalizer::finalize`]: crate::finalizer::SaleFinalizer::finalize
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The tender does not settle the cart total.
    #[error("Payment invalid: {0}")]
    Validation(ValidationError),

    /// The sale store failed. From finalize this means the sale was not
    /// written and no stock was touched.
    #[error("Sale store error: {0}")]
    Persistence(StoreError),

    /// A catalog lookup failed.
    #[error("Product lookup failed: {0}")]
    Store(StoreError),
}

/// Convenience type alias for Results with CheckoutError.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// API Error
// =============================================================================

/// Error handed to the presentation layer.
///
/// ```json
/// {
///   "code": "PAYMENT_ERROR",
///   "message": "Payment invalid: cash amount of $40.00 must be equal to or greater than $42.50"
/// }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Requested quantity exceeds stock
    InsufficientStock,

    /// Cart operation failed
    CartError,

    /// Tender does not settle the sale
    PaymentError,

    /// Storage operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::CartTooLarge { .. } | CoreError::EmptyCart => {
                ApiError::new(ErrorCode::CartError, err.to_string())
            }
            CoreError::QuantityTooLarge { .. } => ApiError::validation(err.to_string()),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => {
                ApiError::new(ErrorCode::NotFound, format!("{what} not found"))
            }
            StoreError::Rejected(reason) => ApiError::validation(reason),
            StoreError::Unavailable(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Store unavailable: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Core(e) => e.into(),
            CheckoutError::Validation(_) => {
                ApiError::new(ErrorCode::PaymentError, err.to_string())
            }
            CheckoutError::Persistence(e) => {
                tracing::error!("Sale persistence failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Failed to save sale")
            }
            CheckoutError::Store(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================
