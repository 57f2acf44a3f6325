//! # Sale Repository
//!
//! Database operations for finalized sales and their items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create(NewSale) → Sale { stock_sync: Pending }                 │
//! │         sale row + every item row in ONE transaction                   │
//! │                                                                         │
//! │  2. APPLY STOCK (per item, done by the finalizer)                      │
//! │     └── apply_item_stock(sale_id, item_id)                             │
//! │         marker claim + product decrement in ONE transaction            │
//! │                                                                         │
//! │  3. SYNCED                                                             │
//! │     └── mark_stock_synced(sale_id) → Sale { stock_sync: Synced }       │
//! │                                                                         │
//! │  Sales stuck between 1 and 3 are returned by find_pending_stock_sync.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tender breakdown is stored flattened on the `sales` row
//! (`cash_cents`, `eft_cents`, `change_cents`, `reference`).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::{
    Money, NewSale, PaymentMode, Sale, SaleItem, SaleStatus, StockSync, TenderBreakdown,
};

const SALE_COLUMNS: &str = "id, date, status, subtotal_cents, tax_cents, total_cents, \
     payment_method, cash_cents, eft_cents, change_cents, reference, stock_sync";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name, unit_price_cents, \
     quantity, line_total_cents, stock_applied";

/// A `sales` row before its items are attached.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    date: DateTime<Utc>,
    status: SaleStatus,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    payment_method: PaymentMode,
    cash_cents: Option<i64>,
    eft_cents: Option<i64>,
    change_cents: i64,
    reference: Option<String>,
    stock_sync: StockSync,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            date: self.date,
            status: self.status,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            payment_method: self.payment_method,
            payment: TenderBreakdown {
                mode: self.payment_method,
                cash_amount: self.cash_cents.map(Money::from_cents),
                eft_amount: self.eft_cents.map(Money::from_cents),
                reference: self.reference,
                change_amount: Money::from_cents(self.change_cents),
            },
            stock_sync: self.stock_sync,
            items,
        }
    }
}

/// Reads and writes `sales` with their `sale_items`.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a sale and all of its items atomically.
    ///
    /// The id and timestamp are assigned here. If any insert fails the
    /// transaction is rolled back and nothing is written.
    pub async fn create(&self, new_sale: NewSale) -> DbResult<Sale> {
        let sale = new_sale.into_sale(Uuid::new_v4().to_string(), Utc::now());

        debug!(id = %sale.id, items = sale.items.len(), "Creating sale");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, date, status,
                subtotal_cents, tax_cents, total_cents,
                payment_method, cash_cents, eft_cents, change_cents, reference,
                stock_sync
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.date)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.payment.cash_amount.map(|m| m.cents()))
        .bind(sale.payment.eft_amount.map(|m| m.cents()))
        .bind(sale.payment.change_amount.cents())
        .bind(&sale.payment.reference)
        .bind(sale.stock_sync)
        .execute(&mut *tx)
        .await?;

        for item in &sale.items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, product_name,
                    unit_price_cents, quantity, line_total_cents, stock_applied
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .bind(item.stock_applied)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %sale.id, total_cents = sale.total_cents, "Sale persisted");
        Ok(sale)
    }

    /// Gets a sale with its items by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.attach_items(row).await?)),
            None => Ok(None),
        }
    }

    /// Sales with items in `[start, end)`, newest first.
    ///
    /// Either bound may be omitted.
    pub async fn find_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date < ?2) \
             ORDER BY date DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.attach_all(rows).await
    }

    /// Completed sales whose stock decrements have not all landed, oldest
    /// first.
    pub async fn find_pending_stock_sync(&self) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE stock_sync = ?1 AND status = ?2 \
             ORDER BY date ASC"
        ))
        .bind(StockSync::Pending)
        .bind(SaleStatus::Completed)
        .fetch_all(&self.pool)
        .await?;

        self.attach_all(rows).await
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Decrements the item's product by the item's quantity and marks the
    /// item applied, in one transaction.
    ///
    /// Returns `Ok(false)` when the item was already applied; nothing is
    /// written then, so retrying after a lost acknowledgement is safe.
    pub async fn apply_item_stock(&self, sale_id: &str, item_id: &str) -> DbResult<bool> {
        debug!(sale_id = %sale_id, item_id = %item_id, "Applying item stock");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let claimed = sqlx::query(
            "UPDATE sale_items SET stock_applied = 1 \
             WHERE id = ?1 AND sale_id = ?2 AND stock_applied = 0",
        )
        .bind(item_id)
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM sale_items WHERE id = ?1 AND sale_id = ?2")
                    .bind(item_id)
                    .bind(sale_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return match exists {
                Some(_) => Ok(false),
                None => Err(DbError::not_found("SaleItem", item_id)),
            };
        }

        let (product_id, quantity): (String, i64) = sqlx::query_as(
            "SELECT product_id, quantity FROM sale_items WHERE id = ?1 AND sale_id = ?2",
        )
        .bind(item_id)
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(&product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // Dropping `tx` rolls the marker back
        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product_id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(true)
    }

    /// Flips a sale to `stock_sync = synced`.
    pub async fn mark_stock_synced(&self, sale_id: &str) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Marking sale stock synced");

        let result = sqlx::query("UPDATE sales SET stock_sync = ?2 WHERE id = ?1")
            .bind(sale_id)
            .bind(StockSync::Synced)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Changes the status of a sale (e.g. cancelling it).
    pub async fn update_status(&self, sale_id: &str, status: SaleStatus) -> DbResult<()> {
        debug!(sale_id = %sale_id, status = ?status, "Updating sale status");

        let result = sqlx::query("UPDATE sales SET status = ?2 WHERE id = ?1")
            .bind(sale_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    async fn attach_items(&self, row: SaleRow) -> DbResult<Sale> {
        let items = self.get_items(&row.id).await?;
        Ok(row.into_sale(items))
    }

    async fn attach_all(&self, rows: Vec<SaleRow>) -> DbResult<Vec<Sale>> {
        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            sales.push(self.attach_items(row).await?);
        }
        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
