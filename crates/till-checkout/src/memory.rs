//! In-memory store implementations for testing.
//!
//! Both stores count their calls and can be told to fail, so tests can
//! assert exactly which collaborators a checkout touched. A sale store built
//! with [`InMemorySaleStore::with_catalog`] applies item stock to that
//! catalog under its own lock, the way SQLite does in one transaction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use till_core::{NewSale, Product, Sale, SaleStatus, StockSync};

use crate::error::StoreError;
use crate::store::{ProductStore, SaleStore};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Default)]
struct InMemoryProductState {
    products: HashMap<String, Product>,
    lookup_calls: usize,
    stock_update_calls: usize,
    /// Remaining injected `Unavailable` failures per product.
    stock_failures: HashMap<String, u32>,
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    state: Arc<RwLock<InMemoryProductState>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `products`.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        for product in products {
            store.insert(product);
        }
        store
    }

    pub fn insert(&self, product: Product) {
        write(&self.state)
            .products
            .insert(product.id.clone(), product);
    }

    /// Removes a product, as if it had been deleted from the catalog.
    pub fn remove(&self, product_id: &str) {
        write(&self.state).products.remove(product_id);
    }

    /// Overwrites a product's stock without counting a call.
    pub fn set_stock(&self, product_id: &str, stock: i64) {
        if let Some(product) = write(&self.state).products.get_mut(product_id) {
            product.stock = stock;
        }
    }

    /// Makes the next `times` stock updates for `product_id` fail with
    /// [`StoreError::Unavailable`].
    pub fn fail_stock_updates(&self, product_id: &str, times: u32) {
        write(&self.state)
            .stock_failures
            .insert(product_id.to_string(), times);
    }

    pub fn stock(&self, product_id: &str) -> Option<i64> {
        read(&self.state).products.get(product_id).map(|p| p.stock)
    }

    /// Number of `find_by_id` and `find_by_barcode` calls.
    pub fn lookup_calls(&self) -> usize {
        read(&self.state).lookup_calls
    }

    /// Number of stock adjustments, failed attempts included. Item stock
    /// applied through a sale store sharing this catalog counts too.
    pub fn stock_update_calls(&self) -> usize {
        read(&self.state).stock_update_calls
    }

    fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<(), StoreError> {
        let mut state = write(&self.state);
        state.stock_update_calls += 1;

        if let Some(remaining) = state.stock_failures.get_mut(product_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Unavailable(format!(
                    "stock service offline for {product_id}"
                )));
            }
        }

        match state.products.get_mut(product_id) {
            Some(product) => {
                product.stock += delta;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("Product {product_id}"))),
        }
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let mut state = write(&self.state);
        state.lookup_calls += 1;
        Ok(state.products.get(id).cloned())
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Product>, StoreError> {
        let mut state = write(&self.state);
        state.lookup_calls += 1;
        Ok(state
            .products
            .values()
            .find(|p| p.barcode.as_deref() == Some(barcode))
            .cloned())
    }

    async fn update_stock(&self, product_id: &str, delta: i64) -> Result<(), StoreError> {
        self.adjust_stock(product_id, delta)
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Default)]
struct InMemorySaleState {
    sales: Vec<Sale>,
    next_id: u32,
    create_calls: usize,
    apply_calls: usize,
    fail_on_create: bool,
    /// Remaining `apply_item_stock` calls that fail before writing.
    item_stock_failures: u32,
    /// Remaining `apply_item_stock` calls that write, then report failure.
    lost_item_stock_acks: u32,
    stock_synced_failures: u32,
}

fn consume(remaining: &mut u32) -> bool {
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

/// In-memory sale store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySaleStore {
    state: Arc<RwLock<InMemorySaleState>>,
    catalog: InMemoryProductStore,
}

impl InMemorySaleStore {
    /// A store over an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose item stock lands in `catalog`.
    pub fn with_catalog(catalog: InMemoryProductStore) -> Self {
        InMemorySaleStore {
            state: Arc::default(),
            catalog,
        }
    }

    /// Configures the store to fail every create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        write(&self.state).fail_on_create = fail;
    }

    /// Makes the next `times` item stock applications fail with
    /// [`StoreError::Unavailable`] before anything is written.
    pub fn fail_item_stock(&self, times: u32) {
        write(&self.state).item_stock_failures = times;
    }

    /// Makes the next `times` item stock applications commit, then return
    /// [`StoreError::Unavailable`].
    pub fn lose_item_stock_acks(&self, times: u32) {
        write(&self.state).lost_item_stock_acks = times;
    }

    /// Makes the next `times` `mark_stock_synced` calls fail.
    pub fn fail_stock_synced(&self, times: u32) {
        write(&self.state).stock_synced_failures = times;
    }

    pub fn create_calls(&self) -> usize {
        read(&self.state).create_calls
    }

    /// Number of `apply_item_stock` calls, failed attempts included.
    pub fn apply_calls(&self) -> usize {
        read(&self.state).apply_calls
    }

    /// Snapshot of every stored sale, in insertion order.
    pub fn sales(&self) -> Vec<Sale> {
        read(&self.state).sales.clone()
    }

    pub fn get(&self, sale_id: &str) -> Option<Sale> {
        read(&self.state)
            .sales
            .iter()
            .find(|s| s.id == sale_id)
            .cloned()
    }
}

#[async_trait]
impl SaleStore for InMemorySaleStore {
    async fn create(&self, sale: NewSale) -> Result<Sale, StoreError> {
        let mut state = write(&self.state);
        state.create_calls += 1;

        if state.fail_on_create {
            return Err(StoreError::Unavailable("sale store offline".to_string()));
        }

        state.next_id += 1;
        let sale = sale.into_sale(format!("SALE-{:04}", state.next_id), Utc::now());
        state.sales.push(sale.clone());
        Ok(sale)
    }

    async fn find_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sale>, StoreError> {
        let state = read(&self.state);
        let mut sales: Vec<Sale> = state
            .sales
            .iter()
            .filter(|s| start.map_or(true, |start| s.date >= start))
            .filter(|s| end.map_or(true, |end| s.date < end))
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sales)
    }

    async fn find_pending_stock_sync(&self) -> Result<Vec<Sale>, StoreError> {
        Ok(read(&self.state)
            .sales
            .iter()
            .filter(|s| s.stock_sync == StockSync::Pending && s.status == SaleStatus::Completed)
            .cloned()
            .collect())
    }

    async fn apply_item_stock(&self, sale_id: &str, item_id: &str) -> Result<bool, StoreError> {
        let mut guard = write(&self.state);
        let state = &mut *guard;
        state.apply_calls += 1;

        if consume(&mut state.item_stock_failures) {
            return Err(StoreError::Unavailable("sale store offline".to_string()));
        }

        let item = state
            .sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .and_then(|s| s.items.iter_mut().find(|i| i.id == item_id))
            .ok_or_else(|| StoreError::NotFound(format!("SaleItem {item_id}")))?;

        if item.stock_applied {
            return Ok(false);
        }

        self.catalog.adjust_stock(&item.product_id, -item.quantity)?;
        item.stock_applied = true;

        if consume(&mut state.lost_item_stock_acks) {
            return Err(StoreError::Unavailable(
                "connection lost before acknowledgement".to_string(),
            ));
        }

        Ok(true)
    }

    async fn mark_stock_synced(&self, sale_id: &str) -> Result<(), StoreError> {
        let mut state = write(&self.state);

        if consume(&mut state.stock_synced_failures) {
            return Err(StoreError::Unavailable("sale store offline".to_string()));
        }

        let sale = state
            .sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .ok_or_else(|| StoreError::NotFound(format!("Sale {sale_id}")))?;
        sale.stock_sync = StockSync::Synced;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{LineItem, Money, PaymentMode, TenderBreakdown};

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: None,
            barcode: Some(format!("BC-{id}")),
            category: None,
            price_cents: 500,
            cost_cents: None,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_sale(line: LineItem) -> NewSale {
        NewSale {
            status: SaleStatus::Completed,
            subtotal_cents: line.line_total.cents(),
            tax_cents: 0,
            total_cents: line.line_total.cents(),
            payment_method: PaymentMode::Eft,
            payment: TenderBreakdown {
                mode: PaymentMode::Eft,
                cash_amount: None,
                eft_amount: Some(line.line_total),
                reference: Some("T1".to_string()),
                change_amount: Money::zero(),
            },
            stock_sync: StockSync::Pending,
            items: vec![line],
        }
    }

    #[tokio::test]
    async fn test_product_lookup_and_stock_update() {
        let store = InMemoryProductStore::with_products([product("p1", 10)]);

        let found = store.find_by_barcode("BC-p1").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some("p1".to_string()));
        assert!(store.find_by_id("missing").await.unwrap().is_none());
        assert_eq!(store.lookup_calls(), 2);

        store.update_stock("p1", -3).await.unwrap();
        assert_eq!(store.stock("p1"), Some(7));
        assert!(matches!(
            store.update_stock("missing", -1).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_stock_failures_run_out() {
        let store = InMemoryProductStore::with_products([product("p1", 5)]);
        store.fail_stock_updates("p1", 2);

        assert!(matches!(
            store.update_stock("p1", -1).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.update_stock("p1", -1).await.is_err());
        store.update_stock("p1", -1).await.unwrap();

        assert_eq!(store.stock("p1"), Some(4));
        assert_eq!(store.stock_update_calls(), 3);
    }

    #[tokio::test]
    async fn test_sale_store_applies_item_stock_once() {
        let catalog = InMemoryProductStore::with_products([product("p1", 5)]);
        let store = InMemorySaleStore::with_catalog(catalog.clone());
        let line = LineItem::from_product(&product("p1", 5), 2);
        let line_id = line.id.clone();

        let sale = store.create(new_sale(line)).await.unwrap();
        assert_eq!(sale.id, "SALE-0001");
        assert_eq!(store.find_pending_stock_sync().await.unwrap().len(), 1);

        assert!(store.apply_item_stock(&sale.id, &line_id).await.unwrap());
        assert!(!store.apply_item_stock(&sale.id, &line_id).await.unwrap());
        assert_eq!(catalog.stock("p1"), Some(3));
        store.mark_stock_synced(&sale.id).await.unwrap();

        let stored = store.get(&sale.id).unwrap();
        assert!(stored.items[0].stock_applied);
        assert_eq!(stored.stock_sync, StockSync::Synced);
        assert!(store.find_pending_stock_sync().await.unwrap().is_empty());
        assert!(matches!(
            store.apply_item_stock(&sale.id, "missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_item_stock_failure_switches() {
        let catalog = InMemoryProductStore::with_products([product("p1", 5)]);
        let store = InMemorySaleStore::with_catalog(catalog.clone());
        let line = LineItem::from_product(&product("p1", 5), 1);
        let line_id = line.id.clone();
        let sale = store.create(new_sale(line)).await.unwrap();

        store.fail_item_stock(1);
        assert!(store.apply_item_stock(&sale.id, &line_id).await.is_err());
        assert_eq!(catalog.stock("p1"), Some(5));

        store.lose_item_stock_acks(1);
        assert!(matches!(
            store.apply_item_stock(&sale.id, &line_id).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(catalog.stock("p1"), Some(4));
        assert!(!store.apply_item_stock(&sale.id, &line_id).await.unwrap());
        assert_eq!(store.apply_calls(), 3);

        store.fail_stock_synced(1);
        assert!(store.mark_stock_synced(&sale.id).await.is_err());
        store.mark_stock_synced(&sale.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_catalog_product_leaves_item_pending() {
        let store = InMemorySaleStore::new();
        let line = LineItem::from_product(&product("p1", 5), 1);
        let line_id = line.id.clone();
        let sale = store.create(new_sale(line)).await.unwrap();

        assert!(matches!(
            store.apply_item_stock(&sale.id, &line_id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.get(&sale.id).unwrap().items[0].stock_applied);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let store = InMemorySaleStore::new();
        store.set_fail_on_create(true);

        let line = LineItem::from_product(&product("p1", 5), 1);
        assert!(store.create(new_sale(line)).await.is_err());
        assert_eq!(store.create_calls(), 1);
        assert!(store.sales().is_empty());
    }
}
