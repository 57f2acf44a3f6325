//! # Cart Aggregate
//!
//! The shopping cart for one checkout session.
//!
//! ## Ownership
//! A `Cart` is a plain owned value. The session that created it holds it and
//! passes `&mut Cart` to whatever needs to change it; there is no shared
//! cart and no lock.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operation                 Check                    State Change        │
//! │  ─────────                 ─────                    ────────────        │
//! │                                                                         │
//! │  add_item(p, n) ─────────► n (+ existing) ≤ stock ─► push / merge      │
//! │                                                                         │
//! │  update_quantity(id, n) ─► n ≤ known stock ───────► items[i].qty = n   │
//! │                            (n ≤ 0 removes)                              │
//! │                                                                         │
//! │  remove_item(id) ────────► none ──────────────────► retain(!= id)      │
//! │                                                                         │
//! │  clear() ────────────────► none ──────────────────► items.clear()      │
//! │                                                                         │
//! │  After EVERY successful mutation: totals = compute_totals(items, rate) │
//! │  A failed mutation leaves items and totals untouched.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::totals::{compute_totals, CartTotals};
use crate::types::{LineItem, Product, TaxRate};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product increases quantity)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - `totals` always equals `compute_totals(items, tax_rate)`
#[derive(Debug, Clone)]
pub struct Cart {
    items: Vec<LineItem>,
    tax_rate: TaxRate,
    totals: CartTotals,
    created_at: DateTime<Utc>,
}

/// Read model handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl Cart {
    /// Creates a new empty cart priced at `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        Cart {
            items: Vec::new(),
            tax_rate,
            totals: CartTotals::default(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product to the cart or increases quantity if already present.
    ///
    /// ## Behavior
    /// - If product already in cart: merges, `new = existing + quantity`
    /// - If product not in cart: adds a new line with a price snapshot
    /// - Either way the (merged) quantity must not exceed `product.stock`
    ///
    /// Returns the id of the affected line.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<String> {
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }

        let existing = self
            .items
            .iter()
            .position(|item| item.product_id == product.id);

        let requested = match existing {
            Some(index) => self.items[index].quantity + quantity,
            None => quantity,
        };

        if requested > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if !product.can_sell(requested) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested,
            });
        }

        let line_id = match existing {
            Some(index) => {
                let item = &mut self.items[index];
                item.set_quantity(requested);
                item.known_stock = product.stock;
                item.id.clone()
            }
            None => {
                validate_cart_size(self.items.len())
                    .map_err(|_| CoreError::CartTooLarge { max: MAX_CART_ITEMS })?;
                let item = LineItem::from_product(product, quantity);
                let id = item.id.clone();
                self.items.push(item);
                id
            }
        };

        self.recompute();
        Ok(line_id)
    }

    /// Updates the quantity of a line.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: removes the line
    /// - Unknown line id: no-op
    /// - Otherwise the quantity is checked against the line's known stock
    ///   before it replaces the current one
    pub fn update_quantity(&mut self, line_item_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_item(line_item_id);
            return Ok(());
        }

        let Some(item) = self.items.iter_mut().find(|i| i.id == line_item_id) else {
            return Ok(());
        };

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if quantity > item.known_stock {
            return Err(CoreError::InsufficientStock {
                product: item.product_name.clone(),
                available: item.known_stock,
                requested: quantity,
            });
        }

        item.set_quantity(quantity);
        self.recompute();
        Ok(())
    }

    /// Records the latest stock level seen for a product in the cart.
    pub fn refresh_stock(&mut self, product_id: &str, stock: i64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.known_stock = stock;
        }
    }

    /// Removes a line by id. No-op if absent.
    pub fn remove_item(&mut self, line_item_id: &str) {
        let before = self.items.len();
        self.items.retain(|i| i.id != line_item_id);

        if self.items.len() != before {
            self.recompute();
        }
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
        self.recompute();
    }

    /// Finds a line by its id.
    pub fn line(&self, line_item_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == line_item_id)
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> CartTotals {
        self.totals
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// When the cart was created or last cleared.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the number of distinct lines in the cart.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of the cart for display.
    pub fn view(&self) -> CartView {
        CartView {
            items: self.items.clone(),
            subtotal: self.totals.subtotal,
            tax: self.totals.tax,
            total: self.totals.total,
        }
    }

    fn recompute(&mut self) {
        self.totals = compute_totals(&self.items, self.tax_rate);
    }
}
