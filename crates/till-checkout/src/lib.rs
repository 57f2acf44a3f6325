//! # till-checkout: Checkout Orchestration for Till POS
//!
//! Per-till checkout sessions, sale finalization and stock reconciliation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Checkout                                │
//! │                                                                         │
//! │  Presentation layer                                                    │
//! │       │  CartView / Receipt / ApiError                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 till-checkout (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   CheckoutSession ──► SaleFinalizer ──► ProductStore            │   │
//! │  │   (owns one Cart)     (saga)       └──► SaleStore               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  till-core (cart, totals, tender)      till-db (SQLite adapters)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`session`] - The per-till session that owns a cart
//! - [`finalizer`] - Sale finalization and stock reconciliation
//! - [`store`] - `ProductStore` / `SaleStore` traits and SQLite adapters
//! - [`memory`] - In-memory stores for tests
//! - [`receipt`] - Receipt built from a completed sale
//! - [`report`] - Period sales report loaded from the sale store
//! - [`config`] - Checkout configuration
//! - [`error`] - Checkout and API error types
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use till_checkout::{CheckoutConfig, CheckoutSession};
//! use till_core::TenderInput;
//! use till_db::{Database, DbConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DbConfig::new("till.db")).await?;
//! let mut session = CheckoutSession::new(db.products(), db.sales(), CheckoutConfig::from_env());
//!
//! session.add_by_barcode("9300000000001", 2).await?;
//! let done = session.finalize(&TenderInput::cash("20.00")).await?;
//! println!("sale {} stock synced: {}", done.sale.id, done.stock.is_synced());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod finalizer;
pub mod logging;
pub mod memory;
pub mod receipt;
pub mod report;
pub mod session;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::CheckoutConfig;
pub use error::{ApiError, CheckoutError, CheckoutResult, ErrorCode, StoreError};
pub use finalizer::{
    CompletedCheckout, ReconcileReport, SaleFinalizer, StockOutcome, StockUpdateFailure,
};
pub use logging::init_tracing;
pub use receipt::Receipt;
pub use report::{load_report, SalesReport};
pub use session::CheckoutSession;
pub use store::{ProductStore, SaleStore};
