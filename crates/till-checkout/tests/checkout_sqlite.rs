//! End-to-end checkout against an in-memory SQLite database.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use till_checkout::{
    CheckoutConfig, CheckoutError, CheckoutSession, Receipt, SaleFinalizer, SaleStore,
    StockOutcome, StoreError,
};
use till_core::report::{day_bounds, summarize};
use till_core::{NewSale, Product, Sale, StockSync, TenderInput};
use till_db::repository::product::generate_product_id;
use till_db::{Database, DbConfig, SaleRepository};

fn product(name: &str, barcode: &str, price_cents: i64, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: generate_product_id(),
        name: name.to_string(),
        description: None,
        barcode: Some(barcode.to_string()),
        category: Some("Cafe".to_string()),
        price_cents,
        cost_cents: None,
        stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn config() -> CheckoutConfig {
    CheckoutConfig {
        stock_retry_backoff_ms: 0,
        ..CheckoutConfig::default()
    }
}

async fn seeded() -> (Database, Product, Product) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let coffee = db
        .products()
        .insert(&product("Flat White", "9300000000001", 500, 10))
        .await
        .unwrap();
    let cake = db
        .products()
        .insert(&product("Carrot Cake", "9300000000002", 2000, 4))
        .await
        .unwrap();
    (db, coffee, cake)
}

async fn stock_of(db: &Database, id: &str) -> i64 {
    db.products().get_by_id(id).await.unwrap().unwrap().stock
}

/// Sale store whose item stock writes fail while `outages` is above zero,
/// and commit but report failure while `lost_acks` is above zero.
#[derive(Clone)]
struct FlakySales {
    inner: SaleRepository,
    outages: Arc<AtomicU32>,
    lost_acks: Arc<AtomicU32>,
}

impl FlakySales {
    fn new(inner: SaleRepository) -> Self {
        FlakySales {
            inner,
            outages: Arc::new(AtomicU32::new(0)),
            lost_acks: Arc::new(AtomicU32::new(0)),
        }
    }
}

fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl SaleStore for FlakySales {
    async fn create(&self, sale: NewSale) -> Result<Sale, StoreError> {
        SaleStore::create(&self.inner, sale).await
    }

    async fn find_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sale>, StoreError> {
        SaleStore::find_all(&self.inner, start, end).await
    }

    async fn find_pending_stock_sync(&self) -> Result<Vec<Sale>, StoreError> {
        SaleStore::find_pending_stock_sync(&self.inner).await
    }

    async fn apply_item_stock(&self, sale_id: &str, item_id: &str) -> Result<bool, StoreError> {
        if take(&self.outages) {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        let applied = SaleStore::apply_item_stock(&self.inner, sale_id, item_id).await?;
        if take(&self.lost_acks) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        Ok(applied)
    }

    async fn mark_stock_synced(&self, sale_id: &str) -> Result<(), StoreError> {
        SaleStore::mark_stock_synced(&self.inner, sale_id).await
    }
}

#[tokio::test]
async fn cash_checkout_decrements_stock_and_persists_sale() {
    let (db, coffee, cake) = seeded().await;
    let mut session = CheckoutSession::new(db.products(), db.sales(), config());

    session.add_by_barcode("9300000000001", 2).await.unwrap();
    session.add_by_barcode("9300000000002", 1).await.unwrap();

    let view = session.view();
    assert_eq!(view.subtotal.cents(), 3000);
    assert_eq!(view.tax.cents(), 273);

    let done = session.finalize(&TenderInput::cash("30.00")).await.unwrap();

    assert_eq!(done.stock, StockOutcome::Synced);
    assert_eq!(done.sale.subtotal_cents, 3000);
    assert_eq!(done.sale.tax_cents, 273);
    assert_eq!(done.sale.payment.change_amount.cents(), 0);
    assert!(session.cart().is_empty());

    assert_eq!(stock_of(&db, &coffee.id).await, 8);
    assert_eq!(stock_of(&db, &cake.id).await, 3);

    let stored = db.sales().get_by_id(&done.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.stock_sync, StockSync::Synced);
    assert!(stored.items.iter().all(|i| i.stock_applied));

    let receipt = Receipt::from_sale(&stored, session.finalizer().config());
    assert_eq!(receipt.receipt_number, &done.sale.id[..8]);
    assert_eq!(receipt.items.len(), 2);

    let (start, end) = day_bounds(Utc::now().date_naive());
    let today = db.sales().find_all(Some(start), Some(end)).await.unwrap();
    let summary = summarize(&today);
    assert_eq!(summary.count, 1);
    assert_eq!(summary.total.cents(), 3000);
}

#[tokio::test]
async fn rejected_tender_writes_nothing() {
    let (db, coffee, _) = seeded().await;
    let mut session = CheckoutSession::new(db.products(), db.sales(), config());
    session.add_by_barcode("9300000000001", 3).await.unwrap();

    let err = session.finalize(&TenderInput::eft("   ")).await;

    assert!(matches!(err, Err(CheckoutError::Validation(_))));
    assert_eq!(session.cart().item_count(), 1);
    assert!(db.sales().find_all(None, None).await.unwrap().is_empty());
    assert_eq!(stock_of(&db, &coffee.id).await, 10);
}

#[tokio::test]
async fn update_quantity_checks_database_stock() {
    let (db, _, cake) = seeded().await;
    let mut session = CheckoutSession::new(db.products(), db.sales(), config());
    let line = session.add_by_barcode("9300000000002", 1).await.unwrap();

    // Stock sold at another till
    db.products().update_stock(&cake.id, -2).await.unwrap();

    assert!(session.update_quantity(&line, 3).await.is_err());
    session.update_quantity(&line, 2).await.unwrap();
    assert_eq!(session.view().items[0].quantity, 2);
}

#[tokio::test]
async fn outage_leaves_sale_pending_until_reconciled() {
    let (db, coffee, cake) = seeded().await;
    let sales = FlakySales::new(db.sales());
    let mut session = CheckoutSession::new(db.products(), sales.clone(), config());

    session.add_by_barcode("9300000000001", 2).await.unwrap();
    session.add_by_barcode("9300000000002", 1).await.unwrap();

    // Enough to exhaust every attempt for the first item only
    sales
        .outages
        .store(config().stock_update_attempts, Ordering::SeqCst);

    let done = session
        .finalize(&TenderInput::split("10.00", "EFT-42"))
        .await
        .unwrap();

    let StockOutcome::PendingReconciliation(failures) = &done.stock else {
        panic!("expected pending reconciliation, got {:?}", done.stock);
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].product_id, coffee.id);
    assert!(session.cart().is_empty());
    assert_eq!(stock_of(&db, &coffee.id).await, 10);
    assert_eq!(stock_of(&db, &cake.id).await, 3);

    let pending = db.sales().find_pending_stock_sync().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].payment.eft_amount.map(|m| m.cents()), Some(2000));

    let reconciler = SaleFinalizer::new(db.products(), sales, config());
    let report = reconciler.reconcile_pending().await.unwrap();
    assert_eq!(report.sales_synced, 1);
    assert_eq!(report.items_applied, 1);

    assert_eq!(stock_of(&db, &coffee.id).await, 8);
    assert_eq!(stock_of(&db, &cake.id).await, 3);
    assert!(db.sales().find_pending_stock_sync().await.unwrap().is_empty());
}

#[tokio::test]
async fn lost_acknowledgement_is_not_applied_twice() {
    let (db, coffee, cake) = seeded().await;
    let sales = FlakySales::new(db.sales());
    let single_attempt = CheckoutConfig {
        stock_update_attempts: 1,
        ..config()
    };
    let mut session = CheckoutSession::new(db.products(), sales.clone(), single_attempt.clone());

    session.add_by_barcode("9300000000001", 2).await.unwrap();
    session.add_by_barcode("9300000000002", 1).await.unwrap();
    sales.lost_acks.store(1, Ordering::SeqCst);

    let done = session.finalize(&TenderInput::eft("EFT-77")).await.unwrap();

    assert!(!done.stock.is_synced());
    assert_eq!(stock_of(&db, &coffee.id).await, 8);
    assert_eq!(stock_of(&db, &cake.id).await, 3);

    let reconciler = SaleFinalizer::new(db.products(), sales, single_attempt);
    let report = reconciler.reconcile_pending().await.unwrap();
    assert_eq!(report.sales_synced, 1);
    assert_eq!(report.items_failed, 0);

    assert_eq!(stock_of(&db, &coffee.id).await, 8);
    let stored = db.sales().get_by_id(&done.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.stock_sync, StockSync::Synced);
    assert!(stored.items.iter().all(|i| i.stock_applied));
}
