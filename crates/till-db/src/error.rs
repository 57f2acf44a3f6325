//! # Database Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                                                           │
//! │    RowNotFound ─────────────────────────► NotFound                     │
//! │    Database(kind = UniqueViolation) ────► UniqueViolation              │
//! │    Database(kind = ForeignKeyViolation) ► ForeignKeyViolation          │
//! │    Database(kind = Check / NotNull) ────► ConstraintViolation          │
//! │    Database(other) ─────────────────────► QueryFailed                  │
//! │    PoolTimedOut ────────────────────────► PoolExhausted                │
//! │    PoolClosed ──────────────────────────► ConnectionFailed             │
//! │    anything else ───────────────────────► Internal                     │
//! │                                                                         │
//! │  DbError ──► StoreError (till-checkout) ──► ApiError                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;
use till_core::ValidationError;

/// Failure of a repository or pool operation.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the id, or an `UPDATE` that touched nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Duplicate barcode, or a sale / line id written twice.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A sale item pointing at a sale that is not there.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A `CHECK` or `NOT NULL` column constraint refused the row, e.g. a
    /// negative price or a zero quantity.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Product input refused before any SQL ran.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The database file could not be opened, or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// `BEGIN` or `COMMIT` failed; the sale was rolled back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within `DbConfig::connect_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the same call might succeed if made again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::TransactionFailed(_)
                | DbError::Internal(_)
        )
    }
}

/// Column named in `UNIQUE constraint failed: <table>.<column>`.
fn unique_column(message: &str) -> &str {
    message
        .split_once("constraint failed: ")
        .map_or("unknown", |(_, column)| column)
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        DbError::duplicate(unique_column(&message), "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::ConstraintViolation(message)
                    }
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
