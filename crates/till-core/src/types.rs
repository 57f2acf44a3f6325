//! # Catalog, Cart and Sale Records
//!
//! The records that flow from the shelf to the sales journal.
//!
//! ## From Shelf to Journal
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Product ─► LineItem ─► Sale                                │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    LineItem     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  product_id     │──►│  items (frozen) │       │
//! │  │  barcode        │   │  unit_price     │   │  totals (frozen)│       │
//! │  │  price_cents    │   │  quantity       │   │  payment        │       │
//! │  │  stock          │   │  line_total     │   │  stock_sync     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  PaymentMode    │   │ TenderBreakdown │       │
//! │  │  bps (u32)      │   │  Cash           │   │  cash / eft     │       │
//! │  │  1000 = 10% GST │   │  Eft            │   │  reference      │       │
//! │  └─────────────────┘   │  Split          │   │  change         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `LineItem` freezes the product name and price when it is added; a `Sale`
//! freezes the lines, totals and tender when it is finalized. Neither follows
//! later edits to the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// GST rate in hundredths of a percent.
///
/// `1000` is the Australian 10%. Prices are tax-inclusive, so the rate only
/// ever feeds [`Money::included_tax`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points without range checking.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate, rejecting rates of 100% or more.
    ///
    /// Included-tax extraction is only meaningful for `0 <= r < 1`.
    pub fn new(bps: u32) -> Result<Self, ValidationError> {
        crate::validation::validate_tax_rate_bps(bps)?;
        Ok(TaxRate(bps))
    }

    /// `8.25` becomes 825 bps. Used when reading `TILL_TAX_RATE`.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage for labels such as "GST 10%".
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog row as the till sees it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// UUID v4, or a seed id such as `prod-001`.
    pub id: String,

    /// Printed on the receipt and copied into each cart line.
    pub name: String,

    pub description: Option<String>,

    /// Scanned code, unique across the catalog when present.
    pub barcode: Option<String>,

    /// Free-form category used for catalog filtering.
    pub category: Option<String>,

    /// Tax-inclusive shelf price in cents.
    pub price_cents: i64,

    /// Supplier cost in cents, when known.
    pub cost_cents: Option<i64>,

    /// Units currently in stock.
    pub stock: i64,

    /// Cleared by `soft_delete`; inactive products cannot be scanned.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity <= self.stock
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product-quantity entry in the cart.
///
/// ## Invariants
/// - `quantity >= 1`
/// - `line_total == unit_price * quantity` (maintained by [`LineItem::set_quantity`])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Generated when the product first enters the cart.
    pub id: String,
    pub product_id: String,
    /// Product name at time of adding (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Price at time of adding (frozen).
    pub unit_price: Money,
    pub line_total: Money,
    /// Stock level last seen for this product.
    pub known_stock: i64,
}

impl LineItem {
    /// Creates a new line from a product, freezing its name and price.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        LineItem {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price(),
            line_total: product.price().multiply_quantity(quantity),
            known_stock: product.stock,
        }
    }

    /// Replaces the quantity and recomputes the line total.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
        self.line_total = self.unit_price.multiply_quantity(quantity);
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle of a sale row. Reports count `Completed` sales only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    /// Paid and finalized. The only status checkout produces.
    Completed,
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        Self::Pending
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Physical cash, change may be due.
    Cash,
    /// Card payment on an external terminal, identified by a reference.
    Eft,
    /// Part cash, part EFT.
    Split,
}

impl PaymentMode {
    /// All modes in report order.
    pub const ALL: [PaymentMode; 3] = [PaymentMode::Cash, PaymentMode::Eft, PaymentMode::Split];

    /// Label used on receipts.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Eft => "EFT",
            PaymentMode::Split => "Split Payment",
        }
    }
}

// =============================================================================
// Stock Sync
// =============================================================================

/// Whether every stock decrement for a sale has been applied.
///
/// A sale is written `Pending` and flipped to `Synced` once the last item's
/// decrement lands; sales left `Pending` are picked up by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockSync {
    Pending,
    Synced,
}

// =============================================================================
// Tender Breakdown
// =============================================================================

/// A validated tender.
///
/// | mode  | cash_amount | eft_amount       | reference | change_amount     |
/// |-------|-------------|------------------|-----------|-------------------|
/// | cash  | tendered    | `None`           | `None`    | tendered - total  |
/// | eft   | `None`      | total            | required  | zero              |
/// | split | cash        | derived / forced | required  | cash + eft - total|
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenderBreakdown {
    pub mode: PaymentMode,
    pub cash_amount: Option<Money>,
    pub eft_amount: Option<Money>,
    pub reference: Option<String>,
    pub change_amount: Money,
}

impl TenderBreakdown {
    /// Total handed over by the customer across both legs.
    pub fn paid(&self) -> Money {
        self.cash_amount.unwrap_or_default() + self.eft_amount.unwrap_or_default()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a finalized sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    /// Same id the line carried in the cart.
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Name the customer saw at the till.
    pub product_name: String,
    /// Price charged per unit, unaffected by later price edits.
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    /// Whether this line's stock decrement has been applied.
    pub stock_applied: bool,
}

impl SaleItem {
    /// Freezes a cart line into a sale line.
    pub fn from_line(sale_id: &str, line: &LineItem) -> Self {
        SaleItem {
            id: line.id.clone(),
            sale_id: sale_id.to_string(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            unit_price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            line_total_cents: line.line_total.cents(),
            stock_applied: false,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable finalized sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMode,
    pub payment: TenderBreakdown,
    pub stock_sync: StockSync,
    pub items: Vec<SaleItem>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    /// Items whose stock decrement has not been applied yet.
    pub fn pending_items(&self) -> impl Iterator<Item = &SaleItem> {
        self.items.iter().filter(|item| !item.stock_applied)
    }
}

/// A sale before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMode,
    pub payment: TenderBreakdown,
    pub stock_sync: StockSync,
    pub items: Vec<LineItem>,
}

impl NewSale {
    /// Stamps the record with its generated identity.
    pub fn into_sale(self, id: String, date: DateTime<Utc>) -> Sale {
        let items = self
            .items
            .iter()
            .map(|line| SaleItem::from_line(&id, line))
            .collect();

        Sale {
            id,
            date,
            status: self.status,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            payment_method: self.payment_method,
            payment: self.payment,
            stock_sync: self.stock_sync,
            items,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
