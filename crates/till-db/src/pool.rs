//! # Connection Pool
//!
//! Opens the till database and hands out repositories that share one pool.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Opening the Till Database                          │
//! │                                                                         │
//! │  DbConfig::from_env() / DbConfig::new("till.db") / in_memory()         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  connect_options()                                                     │
//! │    file:    mode=rwc, WAL journal, busy timeout                        │
//! │    memory:  plain sqlite::memory:                                      │
//! │    both:    synchronous=NORMAL, foreign_keys=ON                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool  (max_connections, acquire = connect_timeout)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  embedded migrations (unless disabled)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database ──► products() : ProductRepository                           │
//! │           └─► sales()    : SaleRepository                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several tills can share one database file. WAL lets the report screen
//! read while a checkout writes, and the busy timeout makes a second writer
//! wait for the lock instead of failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

const MEMORY_PATH: &str = ":memory:";

/// Database file used when `TILL_DB_PATH` is not set.
pub const DEFAULT_DB_PATH: &str = "till.db";

// =============================================================================
// Configuration
// =============================================================================

/// Where the till database lives and how the pool around it behaves.
///
/// ```rust
/// use std::time::Duration;
/// use till_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/till/till.db")
///     .max_connections(8)
///     .connect_timeout(Duration::from_secs(10));
/// assert_eq!(config.max_connections, 8);
/// assert!(!config.is_in_memory());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Upper bound on pooled connections. 5 covers one till plus reporting.
    pub max_connections: u32,

    /// Connections opened eagerly and kept warm.
    pub min_connections: u32,

    /// How long a caller waits to acquire a connection before the pool
    /// reports `PoolExhausted`.
    pub connect_timeout: Duration,

    /// Idle connections are closed after this long. `None` keeps them.
    pub idle_timeout: Option<Duration>,

    /// How long a write waits on another connection's lock.
    pub busy_timeout: Duration,

    /// Apply embedded migrations when the pool opens.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database at `path`, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Reads `TILL_DB_PATH` and `TILL_DB_MAX_CONNECTIONS`, falling back to
    /// [`DEFAULT_DB_PATH`] and the defaults of [`DbConfig::new`].
    pub fn from_env() -> Self {
        let path = std::env::var("TILL_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let mut config = DbConfig::new(path);

        if let Ok(raw) = std::env::var("TILL_DB_MAX_CONNECTIONS") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.max_connections = n,
                _ => warn!(value = %raw, "Ignoring invalid TILL_DB_MAX_CONNECTIONS"),
            }
        }

        config
    }

    /// Private database for tests.
    ///
    /// Each SQLite memory database belongs to a single connection, so the
    /// pool holds exactly one and never recycles it.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::ZERO,
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        };

        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        if !self.is_in_memory() {
            options = options
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(self.busy_timeout);
        }

        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to an open till database.
///
/// Clones share the pool; repositories are created on demand.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool described by `config` and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening till database"
        );

        let options = config.connect_options()?;

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!("Pool connected");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies any embedded migration not yet recorded in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    /// Repository calls made afterwards fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing till database");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
