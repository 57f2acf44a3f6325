//! # Sale Finalizer
//!
//! Turns a priced cart and a tender into a persisted sale, then brings
//! inventory in line with it.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         finalize(cart, tender)                          │
//! │                                                                         │
//! │  1. VALIDATE                                                           │
//! │     ├── cart empty        → Err(EmptyCart)         no store calls      │
//! │     └── tender invalid    → Err(Validation)        no store calls      │
//! │                                                                         │
//! │  2. PERSIST                                                            │
//! │     └── SaleStore::create (stock_sync = pending)                       │
//! │         failed            → Err(Persistence)       cart intact         │
//! │                                                                         │
//! │  3. APPLY STOCK  (each item in order, awaited)                         │
//! │     └── SaleStore::apply_item_stock            retried                 │
//! │         decrement + applied marker land together or not at all        │
//! │                                                                         │
//! │  4. SETTLE                                                             │
//! │     ├── all applied       → mark_stock_synced      StockOutcome::Synced │
//! │     └── some failed       → PendingReconciliation(failures)            │
//! │                                                                         │
//! │  Cart is cleared once step 2 succeeds.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales left pending are finished later by [`SaleFinalizer::reconcile_pending`].
//! Each item's stock is applied exactly once: a retry after a lost
//! acknowledgement finds the item already applied and writes nothing.

use serde::Serialize;
use tracing::{debug, info, warn};
use ts_rs::TS;

use till_core::{
    validate_tender, Cart, CoreError, NewSale, Sale, SaleStatus, StockSync, TenderInput,
};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult, StoreError};
use crate::store::{ProductStore, SaleStore};

/// A stock decrement that did not land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockUpdateFailure {
    pub product_id: String,
    pub quantity: i64,
    pub reason: String,
}

/// What happened to inventory after the sale was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "status", content = "failures", rename_all = "snake_case")]
#[ts(export)]
pub enum StockOutcome {
    /// Every decrement applied and the sale is marked synced.
    Synced,
    /// The sale stays `pending` until reconciliation. Empty when only the
    /// final sync marker failed to land.
    PendingReconciliation(Vec<StockUpdateFailure>),
}

impl StockOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, StockOutcome::Synced)
    }
}

/// Result of a successful finalize.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CompletedCheckout {
    pub sale: Sale,
    pub stock: StockOutcome,
}

/// Result of a reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReconcileReport {
    pub sales_checked: usize,
    pub sales_synced: usize,
    pub items_applied: usize,
    pub items_failed: usize,
}

#[derive(Debug, Default)]
struct StockPass {
    applied: usize,
    failures: Vec<StockUpdateFailure>,
}

/// Finalizes sales against a product store and a sale store.
#[derive(Debug, Clone)]
pub struct SaleFinalizer<P, S> {
    products: P,
    sales: S,
    config: CheckoutConfig,
}

impl<P, S> SaleFinalizer<P, S>
where
    P: ProductStore,
    S: SaleStore,
{
    pub fn new(products: P, sales: S, config: CheckoutConfig) -> Self {
        SaleFinalizer {
            products,
            sales,
            config,
        }
    }

    pub fn products(&self) -> &P {
        &self.products
    }

    pub fn sales(&self) -> &S {
        &self.sales
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Finalizes the cart as a completed sale.
    ///
    /// On `Err` nothing was written and the cart is untouched. On `Ok` the
    /// sale is persisted and the cart is empty, whatever `stock` says.
    pub async fn finalize(
        &self,
        cart: &mut Cart,
        tender: &TenderInput,
    ) -> CheckoutResult<CompletedCheckout> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let totals = cart.totals();
        let payment = validate_tender(totals.total, tender).map_err(CheckoutError::Validation)?;

        let new_sale = NewSale {
            status: SaleStatus::Completed,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            payment_method: payment.mode,
            payment,
            stock_sync: StockSync::Pending,
            items: cart.items().to_vec(),
        };

        let mut sale = self
            .sales
            .create(new_sale)
            .await
            .map_err(CheckoutError::Persistence)?;

        info!(
            sale_id = %sale.id,
            total = %sale.total(),
            mode = ?sale.payment_method,
            items = sale.items.len(),
            "Sale completed"
        );

        cart.clear();

        let pass = self.apply_stock(&mut sale).await;
        let stock = if pass.failures.is_empty() && self.settle(&mut sale).await {
            StockOutcome::Synced
        } else {
            warn!(
                sale_id = %sale.id,
                failed = pass.failures.len(),
                "Sale left pending stock reconciliation"
            );
            StockOutcome::PendingReconciliation(pass.failures)
        };

        Ok(CompletedCheckout { sale, stock })
    }

    /// Finishes every sale still marked `pending`.
    ///
    /// Only items not yet applied are decremented. A sale whose items all
    /// land is marked synced; the rest stay pending for the next sweep.
    pub async fn reconcile_pending(&self) -> CheckoutResult<ReconcileReport> {
        let pending = self
            .sales
            .find_pending_stock_sync()
            .await
            .map_err(CheckoutError::Persistence)?;

        let mut report = ReconcileReport::default();

        for mut sale in pending {
            report.sales_checked += 1;

            let pass = self.apply_stock(&mut sale).await;
            report.items_applied += pass.applied;
            report.items_failed += pass.failures.len();

            if pass.failures.is_empty() && self.settle(&mut sale).await {
                report.sales_synced += 1;
            }
        }

        info!(
            checked = report.sales_checked,
            synced = report.sales_synced,
            applied = report.items_applied,
            failed = report.items_failed,
            "Stock reconciliation finished"
        );

        Ok(report)
    }

    /// Applies the decrement of every item not yet marked applied.
    async fn apply_stock(&self, sale: &mut Sale) -> StockPass {
        let mut pass = StockPass::default();

        for item in sale.items.iter_mut().filter(|i| !i.stock_applied) {
            match self.apply_item(&item.sale_id, &item.id).await {
                Ok(newly_applied) => {
                    if !newly_applied {
                        debug!(
                            sale_id = %item.sale_id,
                            item_id = %item.id,
                            "Item stock was already applied"
                        );
                    }
                    item.stock_applied = true;
                    pass.applied += 1;
                }
                Err(e) => {
                    warn!(
                        sale_id = %item.sale_id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %e,
                        "Stock update failed"
                    );
                    pass.failures.push(StockUpdateFailure {
                        product_id: item.product_id.clone(),
                        quantity: item.quantity,
                        reason: e.to_string(),
                    });
                }
            }
        }

        pass
    }

    /// `apply_item_stock`, retrying transient failures.
    async fn apply_item(&self, sale_id: &str, item_id: &str) -> Result<bool, StoreError> {
        let attempts = self.config.stock_update_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.sales.apply_item_stock(sale_id, item_id).await {
                Ok(newly_applied) => return Ok(newly_applied),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    debug!(item_id = %item_id, attempt, error = %e, "Retrying stock update");
                    attempt += 1;
                    tokio::time::sleep(self.config.stock_retry_backoff()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn settle(&self, sale: &mut Sale) -> bool {
        match self.sales.mark_stock_synced(&sale.id).await {
            Ok(()) => {
                sale.stock_sync = StockSync::Synced;
                debug!(sale_id = %sale.id, "Sale stock synced");
                true
            }
            Err(e) => {
                warn!(sale_id = %sale.id, error = %e, "Failed to mark sale stock synced");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryProductStore, InMemorySaleStore};
    use chrono::Utc;
    use till_core::{Product, TaxRate};

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: None,
            barcode: None,
            category: None,
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

    struct Fixture {
        products: InMemoryProductStore,
        sales: InMemorySaleStore,
        finalizer: SaleFinalizer<InMemoryProductStore, InMemorySaleStore>,
        cart: Cart,
    }

    /// Cart: 2 x coffee @ $5.00, 1 x cake @ $20.00.
    fn fixture() -> Fixture {
        let coffee = product("coffee", 500, 10);
        let cake = product("cake", 2000, 5);
        let products = InMemoryProductStore::with_products([coffee.clone(), cake.clone()]);
        let sales = InMemorySaleStore::with_catalog(products.clone());
        let finalizer = SaleFinalizer::new(products.clone(), sales.clone(), config());

        let mut cart = Cart::new(TaxRate::from_bps(1000));
        cart.add_item(&coffee, 2).unwrap();
        cart.add_item(&cake, 1).unwrap();

        Fixture {
            products,
            sales,
            finalizer,
            cart,
        }
    }

    #[tokio::test]
    async fn test_finalize_cash_sale() {
        let mut f = fixture();

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::cash("50.00"))
            .await
            .unwrap();

        assert_eq!(done.stock, StockOutcome::Synced);
        assert_eq!(done.sale.subtotal_cents, 3000);
        assert_eq!(done.sale.tax_cents, 273);
        assert_eq!(done.sale.payment.change_amount.cents(), 2000);
        assert_eq!(done.sale.stock_sync, StockSync::Synced);
        assert!(done.sale.items.iter().all(|i| i.stock_applied));

        assert_eq!(f.products.stock("coffee"), Some(8));
        assert_eq!(f.products.stock("cake"), Some(4));
        assert!(f.cart.is_empty());
        assert_eq!(
            f.sales.get(&done.sale.id).unwrap().stock_sync,
            StockSync::Synced
        );
    }

    #[tokio::test]
    async fn test_invalid_tender_makes_no_store_calls() {
        let mut f = fixture();

        let err = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::cash("10.00"))
            .await;

        assert!(matches!(err, Err(CheckoutError::Validation(_))));
        assert_eq!(f.sales.create_calls(), 0);
        assert_eq!(f.products.stock_update_calls(), 0);
        assert_eq!(f.products.lookup_calls(), 0);
        assert_eq!(f.cart.item_count(), 2);
        assert_eq!(f.cart.totals().total.cents(), 3000);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let f = fixture();
        let mut empty = Cart::new(TaxRate::from_bps(1000));

        let err = f
            .finalizer
            .finalize(&mut empty, &TenderInput::eft("T-1"))
            .await;

        assert!(matches!(err, Err(CheckoutError::Core(CoreError::EmptyCart))));
        assert_eq!(f.sales.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_cart_and_stock() {
        let mut f = fixture();
        f.sales.set_fail_on_create(true);

        let err = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::eft("T-1"))
            .await;

        assert!(matches!(err, Err(CheckoutError::Persistence(_))));
        assert_eq!(f.sales.create_calls(), 1);
        assert_eq!(f.products.stock_update_calls(), 0);
        assert_eq!(f.products.stock("coffee"), Some(10));
        assert_eq!(f.cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_transient_stock_failure_is_retried() {
        let mut f = fixture();
        f.products.fail_stock_updates("coffee", 2);

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::split("20.00", "T-2"))
            .await
            .unwrap();

        assert!(done.stock.is_synced());
        assert_eq!(f.products.stock("coffee"), Some(8));
        // Two failed coffee attempts, one success, one cake update
        assert_eq!(f.products.stock_update_calls(), 4);
    }

    #[tokio::test]
    async fn test_persistent_stock_failure_then_reconcile() {
        let mut f = fixture();
        f.products.fail_stock_updates("cake", 3);

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::eft("T-3"))
            .await
            .unwrap();

        let StockOutcome::PendingReconciliation(failures) = &done.stock else {
            panic!("expected pending reconciliation, got {:?}", done.stock);
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].product_id, "cake");
        assert_eq!(failures[0].quantity, 1);
        assert_eq!(done.sale.stock_sync, StockSync::Pending);
        assert!(f.cart.is_empty());
        assert_eq!(f.products.stock("coffee"), Some(8));
        assert_eq!(f.products.stock("cake"), Some(5));

        let report = f.finalizer.reconcile_pending().await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                sales_checked: 1,
                sales_synced: 1,
                items_applied: 1,
                items_failed: 0,
            }
        );

        // Coffee is not decremented twice
        assert_eq!(f.products.stock("coffee"), Some(8));
        assert_eq!(f.products.stock("cake"), Some(4));
        assert_eq!(
            f.sales.get(&done.sale.id).unwrap().stock_sync,
            StockSync::Synced
        );

        let again = f.finalizer.reconcile_pending().await.unwrap();
        assert_eq!(again, ReconcileReport::default());
    }

    #[tokio::test]
    async fn test_missing_product_is_not_retried() {
        let mut f = fixture();
        f.products.remove("cake");

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::eft("T-4"))
            .await
            .unwrap();

        assert!(!done.stock.is_synced());
        // One coffee update, one cake attempt
        assert_eq!(f.products.stock_update_calls(), 2);
    }

    #[tokio::test]
    async fn test_lost_ack_retry_applies_once() {
        let mut f = fixture();
        f.sales.lose_item_stock_acks(1);

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::eft("T-5"))
            .await
            .unwrap();

        assert!(done.stock.is_synced());
        assert_eq!(f.products.stock("coffee"), Some(8));
        assert_eq!(f.products.stock("cake"), Some(4));
        // Coffee: lost ack, then already applied. Cake: one call
        assert_eq!(f.sales.apply_calls(), 3);
        assert_eq!(f.products.stock_update_calls(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_skips_item_whose_ack_was_lost() {
        let mut f = fixture();
        let single_attempt = SaleFinalizer::new(
            f.products.clone(),
            f.sales.clone(),
            CheckoutConfig {
                stock_update_attempts: 1,
                ..config()
            },
        );
        f.sales.lose_item_stock_acks(1);

        let done = single_attempt
            .finalize(&mut f.cart, &TenderInput::eft("T-6"))
            .await
            .unwrap();

        let StockOutcome::PendingReconciliation(failures) = &done.stock else {
            panic!("expected pending reconciliation, got {:?}", done.stock);
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].product_id, "coffee");
        // The decrement committed even though every acknowledgement was lost
        assert_eq!(f.products.stock("coffee"), Some(8));

        let report = single_attempt.reconcile_pending().await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                sales_checked: 1,
                sales_synced: 1,
                items_applied: 1,
                items_failed: 0,
            }
        );
        assert_eq!(f.products.stock("coffee"), Some(8));
        assert_eq!(f.products.stock("cake"), Some(4));
        assert_eq!(f.products.stock_update_calls(), 2);
    }

    #[tokio::test]
    async fn test_sale_store_outage_leaves_stock_untouched() {
        let mut f = fixture();
        f.sales.fail_item_stock(f.finalizer.config().stock_update_attempts);

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::eft("T-7"))
            .await
            .unwrap();

        assert!(!done.stock.is_synced());
        assert_eq!(f.products.stock("coffee"), Some(10));
        assert_eq!(f.products.stock("cake"), Some(4));

        f.finalizer.reconcile_pending().await.unwrap();
        assert_eq!(f.products.stock("coffee"), Some(8));
    }

    #[tokio::test]
    async fn test_sync_marker_failure_then_reconcile() {
        let mut f = fixture();
        f.sales.fail_stock_synced(1);

        let done = f
            .finalizer
            .finalize(&mut f.cart, &TenderInput::eft("T-8"))
            .await
            .unwrap();

        assert_eq!(done.stock, StockOutcome::PendingReconciliation(vec![]));
        assert_eq!(done.sale.stock_sync, StockSync::Pending);
        assert!(done.sale.items.iter().all(|i| i.stock_applied));
        assert_eq!(f.products.stock("coffee"), Some(8));

        let report = f.finalizer.reconcile_pending().await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                sales_checked: 1,
                sales_synced: 1,
                items_applied: 0,
                items_failed: 0,
            }
        );
        assert_eq!(f.products.stock("coffee"), Some(8));
        assert_eq!(f.products.stock("cake"), Some(4));
        assert_eq!(
            f.sales.get(&done.sale.id).unwrap().stock_sync,
            StockSync::Synced
        );
    }

    #[test]
    fn test_stock_outcome_serialization() {
        let json = serde_json::to_value(StockOutcome::Synced).unwrap();
        assert_eq!(json["status"], "synced");

        let pending = StockOutcome::PendingReconciliation(vec![StockUpdateFailure {
            product_id: "cake".to_string(),
            quantity: 1,
            reason: "offline".to_string(),
        }]);
        let json = serde_json::to_value(pending).unwrap();
        assert_eq!(json["status"], "pending_reconciliation");
        assert_eq!(json["failures"][0]["productId"], "cake");
    }
}
