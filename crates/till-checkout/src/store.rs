//! # Store Traits
//!
//! The two collaborators checkout talks to, and their SQLite adapters.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleFinalizer / CheckoutSession                                       │
//! │       │                         │                                       │
//! │       ▼                         ▼                                       │
//! │  dyn ProductStore           dyn SaleStore                               │
//! │   ├── ProductRepository      ├── SaleRepository      (till-db)         │
//! │   └── InMemoryProductStore   └── InMemorySaleStore   (memory.rs)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use till_core::{NewSale, Product, Sale};
use till_db::{ProductRepository, SaleRepository};

use crate::error::StoreError;

/// Catalog lookups and stock adjustment.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, StoreError>;

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Product>, StoreError>;

    /// Adds `delta` to the product's stock. A sale passes `-quantity`.
    async fn update_stock(&self, product_id: &str, delta: i64) -> Result<(), StoreError>;
}

/// Persistence for finalized sales.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Writes the sale and all its items atomically, assigning id and date.
    async fn create(&self, sale: NewSale) -> Result<Sale, StoreError>;

    /// Sales in `[start, end)`, newest first.
    async fn find_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sale>, StoreError>;

    /// Completed sales with stock decrements still outstanding.
    async fn find_pending_stock_sync(&self) -> Result<Vec<Sale>, StoreError>;

    /// Decrements the item's product by its quantity and marks the item
    /// applied, as one write. `Ok(false)` when it was already applied.
    async fn apply_item_stock(&self, sale_id: &str, item_id: &str) -> Result<bool, StoreError>;

    async fn mark_stock_synced(&self, sale_id: &str) -> Result<(), StoreError>;
}

// =============================================================================
// SQLite Adapters
// =============================================================================

#[async_trait]
impl ProductStore for ProductRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.get_by_id(id).await?)
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Product>, StoreError> {
        Ok(ProductRepository::find_by_barcode(self, barcode).await?)
    }

    async fn update_stock(&self, product_id: &str, delta: i64) -> Result<(), StoreError> {
        Ok(ProductRepository::update_stock(self, product_id, delta).await?)
    }
}

#[async_trait]
impl SaleStore for SaleRepository {
    async fn create(&self, sale: NewSale) -> Result<Sale, StoreError> {
        Ok(SaleRepository::create(self, sale).await?)
    }

    async fn find_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sale>, StoreError> {
        Ok(SaleRepository::find_all(self, start, end).await?)
    }

    async fn find_pending_stock_sync(&self) -> Result<Vec<Sale>, StoreError> {
        Ok(SaleRepository::find_pending_stock_sync(self).await?)
    }

    async fn apply_item_stock(&self, sale_id: &str, item_id: &str) -> Result<bool, StoreError> {
        Ok(SaleRepository::apply_item_stock(self, sale_id, item_id).await?)
    }

    async fn mark_stock_synced(&self, sale_id: &str) -> Result<(), StoreError> {
        Ok(SaleRepository::mark_stock_synced(self, sale_id).await?)
    }
}
