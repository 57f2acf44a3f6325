//! # till-db
//!
//! SQLite persistence for Till POS: the product catalog and the sales
//! journal, on sqlx with embedded migrations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till-checkout                                                         │
//! │    impl ProductStore for ProductRepository                             │
//! │    impl SaleStore    for SaleRepository                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database (pool.rs) ── one SqlitePool, 001_initial_schema applied      │
//! │    ├── products() ──► ProductRepository   catalog + stock deltas       │
//! │    └── sales()    ──► SaleRepository      sales, items, stock markers  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  till.db  (WAL)      or  sqlite::memory: in tests                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust,no_run
//! use till_db::{Database, DbConfig};
//!
//! # async fn run() -> Result<(), till_db::DbError> {
//! let db = Database::new(DbConfig::from_env()).await?;
//! let milk = db.products().search("milk", 20).await?;
//! let pending = db.sales().find_pending_stock_sync().await?;
//! # let _ = (milk, pending);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DEFAULT_DB_PATH};
pub use repository::product::{generate_product_id, ProductRepository};
pub use repository::sale::SaleRepository;
