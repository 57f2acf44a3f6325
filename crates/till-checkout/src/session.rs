//! # Checkout Session
//!
//! One till, one cart. The session owns its [`Cart`] and drives the
//! [`SaleFinalizer`]; the presentation layer holds one per register and
//! calls these operations in response to user actions.
//!
//! ```text
//! scan ──► add_by_barcode ──┐
//! tap  ──► add_item ────────┤
//! +/-  ──► update_quantity ─┼──► Cart (owned) ──► view() ──► CartView
//! bin  ──► remove_item ─────┤
//!          clear_cart ──────┘
//! pay  ──► finalize(tender) ──► CompletedCheckout
//! ```

use tracing::debug;

use till_core::tender::derive_split_eft;
use till_core::{Cart, CartView, CoreError, Money, Product, TenderInput};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::finalizer::{CompletedCheckout, SaleFinalizer};
use crate::store::{ProductStore, SaleStore};

/// A single till's checkout state.
#[derive(Debug)]
pub struct CheckoutSession<P, S> {
    cart: Cart,
    finalizer: SaleFinalizer<P, S>,
}

impl<P, S> CheckoutSession<P, S>
where
    P: ProductStore,
    S: SaleStore,
{
    /// Creates a session with an empty cart priced at the configured rate.
    pub fn new(products: P, sales: S, config: CheckoutConfig) -> Self {
        let cart = Cart::new(config.tax_rate());
        CheckoutSession {
            cart,
            finalizer: SaleFinalizer::new(products, sales, config),
        }
    }

    pub fn view(&self) -> CartView {
        self.cart.view()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn finalizer(&self) -> &SaleFinalizer<P, S> {
        &self.finalizer
    }

    /// Adds `quantity` of an already loaded product. Returns the line id.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CheckoutResult<String> {
        Ok(self.cart.add_item(product, quantity)?)
    }

    /// Looks a product up by barcode and adds it. Returns the line id.
    pub async fn add_by_barcode(&mut self, barcode: &str, quantity: i64) -> CheckoutResult<String> {
        let product = self
            .finalizer
            .products()
            .find_by_barcode(barcode)
            .await
            .map_err(CheckoutError::Store)?
            .ok_or_else(|| CoreError::ProductNotFound(barcode.to_string()))?;

        debug!(barcode = %barcode, product_id = %product.id, "Scanned product");
        self.add_item(&product, quantity)
    }

    /// Sets a line's quantity, checked against the product's current stock.
    ///
    /// `quantity <= 0` removes the line without a lookup. An unknown line id
    /// is a no-op.
    pub async fn update_quantity(&mut self, line_item_id: &str, quantity: i64) -> CheckoutResult<()> {
        if quantity <= 0 {
            self.cart.remove_item(line_item_id);
            return Ok(());
        }

        let Some(product_id) = self.cart.line(line_item_id).map(|l| l.product_id.clone()) else {
            return Ok(());
        };

        let product = self
            .finalizer
            .products()
            .find_by_id(&product_id)
            .await
            .map_err(CheckoutError::Store)?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

        self.cart.refresh_stock(&product_id, product.stock);
        Ok(self.cart.update_quantity(line_item_id, quantity)?)
    }

    pub fn remove_item(&mut self, line_item_id: &str) {
        self.cart.remove_item(line_item_id);
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// EFT portion shown while the cashier types the cash part of a split
    /// tender. `None` while the cash figure does not parse.
    pub fn split_eft_preview(&self, cash: &str) -> Option<Money> {
        let cash = Money::parse_amount("split cash amount", cash).ok()?;
        Some(derive_split_eft(self.cart.totals().total, cash))
    }

    /// Finalizes the cart. See [`SaleFinalizer::finalize`].
    pub async fn finalize(&mut self, tender: &TenderInput) -> CheckoutResult<CompletedCheckout> {
        self.finalizer.finalize(&mut self.cart, tender).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalizer::StockOutcome;
    use crate::memory::{InMemoryProductStore, InMemorySaleStore};
    use chrono::Utc;

    fn product(id: &str, barcode: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: None,
            barcode: Some(barcode.to_string()),
            category: None,
            price_cents,
            cost_cents: None,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn session(
        products: &InMemoryProductStore,
    ) -> (
        CheckoutSession<InMemoryProductStore, InMemorySaleStore>,
        InMemorySaleStore,
    ) {
        let sales = InMemorySaleStore::with_catalog(products.clone());
        let config = CheckoutConfig {
            stock_retry_backoff_ms: 0,
            ..CheckoutConfig::default()
        };
        (
            CheckoutSession::new(products.clone(), sales.clone(), config),
            sales,
        )
    }

    #[tokio::test]
    async fn test_scan_merges_lines() {
        let products = InMemoryProductStore::with_products([product("latte", "9300001", 550, 10)]);
        let (mut session, _) = session(&products);

        let first = session.add_by_barcode("9300001", 2).await.unwrap();
        let second = session.add_by_barcode("9300001", 3).await.unwrap();

        assert_eq!(first, second);
        let view = session.view();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.total.cents(), 2750);
    }

    #[tokio::test]
    async fn test_unknown_barcode() {
        let products = InMemoryProductStore::new();
        let (mut session, _) = session(&products);

        let err = session.add_by_barcode("0000", 1).await;
        assert!(matches!(
            err,
            Err(CheckoutError::Core(CoreError::ProductNotFound(_)))
        ));
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_uses_live_stock() {
        let products = InMemoryProductStore::with_products([product("muffin", "9300002", 450, 10)]);
        let (mut session, _) = session(&products);
        let line = session.add_by_barcode("9300002", 1).await.unwrap();

        // Another till sold most of them
        products.set_stock("muffin", 3);

        let err = session.update_quantity(&line, 4).await;
        assert!(matches!(
            err,
            Err(CheckoutError::Core(CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }))
        ));
        assert_eq!(session.view().items[0].quantity, 1);

        session.update_quantity(&line, 3).await.unwrap();
        assert_eq!(session.view().items[0].quantity, 3);
        assert_eq!(session.view().items[0].known_stock, 3);
    }

    #[tokio::test]
    async fn test_update_quantity_zero_removes_without_lookup() {
        let products = InMemoryProductStore::with_products([product("muffin", "9300002", 450, 10)]);
        let (mut session, _) = session(&products);
        let line = session.add_by_barcode("9300002", 1).await.unwrap();
        let lookups = products.lookup_calls();

        session.update_quantity(&line, 0).await.unwrap();
        assert!(session.cart().is_empty());
        assert_eq!(products.lookup_calls(), lookups);

        // Unknown line id is a no-op
        session.update_quantity("missing", 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_quantity_vanished_product() {
        let products = InMemoryProductStore::with_products([product("pie", "9300003", 600, 10)]);
        let (mut session, _) = session(&products);
        let line = session.add_by_barcode("9300003", 1).await.unwrap();

        products.remove("pie");

        let err = session.update_quantity(&line, 2).await;
        assert!(matches!(
            err,
            Err(CheckoutError::Core(CoreError::ProductNotFound(_)))
        ));
        assert_eq!(session.view().items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_split_preview() {
        let products = InMemoryProductStore::with_products([product("cake", "9300004", 10000, 5)]);
        let (mut session, _) = session(&products);
        session.add_by_barcode("9300004", 1).await.unwrap();

        assert_eq!(session.split_eft_preview("60.00"), Some(Money::from_cents(4000)));
        assert_eq!(session.split_eft_preview("150"), Some(Money::zero()));
        assert_eq!(session.split_eft_preview("abc"), None);
    }

    #[tokio::test]
    async fn test_finalize_clears_cart() {
        let products = InMemoryProductStore::with_products([product("cake", "9300004", 2000, 5)]);
        let (mut session, sales) = session(&products);
        session.add_by_barcode("9300004", 2).await.unwrap();

        let done = session.finalize(&TenderInput::eft("EFT-77")).await.unwrap();

        assert_eq!(done.stock, StockOutcome::Synced);
        assert_eq!(done.sale.payment.reference.as_deref(), Some("EFT-77"));
        assert!(session.cart().is_empty());
        assert_eq!(sales.sales().len(), 1);
        assert_eq!(products.stock("cake"), Some(3));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let products = InMemoryProductStore::with_products([
            product("a", "1", 100, 5),
            product("b", "2", 200, 5),
        ]);
        let (mut session, _) = session(&products);
        let a = session.add_by_barcode("1", 1).await.unwrap();
        session.add_by_barcode("2", 1).await.unwrap();

        session.remove_item(&a);
        assert_eq!(session.view().items.len(), 1);
        assert_eq!(session.view().total.cents(), 200);

        session.clear_cart();
        assert_eq!(session.view().total, Money::zero());
    }
}
