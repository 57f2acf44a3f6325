//! # Sales Reports
//!
//! Aggregation over finalized sales for the reporting screen.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  period_bounds(period, date) ──► (start, end)                          │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │  SaleStore::find_all(start, end) ──► Vec<Sale>                         │
//! │                                      │                                  │
//! │          ┌──────────────┬────────────┼─────────────┬──────────────┐     │
//! │          ▼              ▼            ▼             ▼              ▼     │
//! │      summarize    best_sellers  by_payment    tender_totals  by_hour   │
//! │                                                                         │
//! │  Only `completed` sales are counted by any aggregate.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function of its input slice.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMode, Sale};

// =============================================================================
// Report Types
// =============================================================================

/// Headline figures for a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub total: Money,
    pub count: usize,
    /// Average transaction, rounded to the cent.
    pub average: Money,
}

/// A product ranked by units sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BestSeller {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub total_sales: Money,
}

/// Sales recorded under one payment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentMethodTotal {
    pub method: PaymentMode,
    pub count: usize,
    pub total: Money,
}

/// Money taken per tender type, with split sales divided into their legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TenderTotals {
    pub cash: Money,
    pub eft: Money,
}

/// Sales total for one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HourlyTotal {
    pub hour: u32,
    pub total: Money,
}

/// Reporting period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReportPeriod {
    Daily,
    /// Monday to Sunday.
    Weekly,
    Monthly,
}

// =============================================================================
// Date Ranges
// =============================================================================

/// Start and end of `date` in UTC, as a half-open range `[start, end)`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use till_core::report::day_bounds;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let (start, end) = day_bounds(date);
/// assert_eq!((end - start).num_hours(), 24);
/// ```
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Half-open UTC range covering the period that contains `date`.
pub fn period_bounds(period: ReportPeriod, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        ReportPeriod::Daily => day_bounds(date),
        ReportPeriod::Weekly => {
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            let (start, _) = day_bounds(monday);
            (start, start + Duration::days(7))
        }
        ReportPeriod::Monthly => {
            let first = date.with_day(1).unwrap_or(date);
            let next = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
            }
            .unwrap_or(first);
            (day_bounds(first).0, day_bounds(next).0)
        }
    }
}

// =============================================================================
// Aggregates
// =============================================================================

fn completed(sales: &[Sale]) -> impl Iterator<Item = &Sale> {
    sales.iter().filter(|sale| sale.is_completed())
}

/// Total, count and average of completed sales.
pub fn summarize(sales: &[Sale]) -> SalesSummary {
    let (total, count) = completed(sales).fold((Money::zero(), 0usize), |(sum, n), sale| {
        (sum + sale.total(), n + 1)
    });

    let average = if count == 0 {
        Money::zero()
    } else {
        Money::from_cents(div_round(i128::from(total.cents()), count as i128))
    };

    SalesSummary {
        total,
        count,
        average,
    }
}

/// Products ranked by units sold, most first, at most `limit` entries.
///
/// Ties on quantity are broken by product name so the order is stable.
pub fn best_sellers(sales: &[Sale], limit: usize) -> Vec<BestSeller> {
    let mut by_product: HashMap<&str, BestSeller> = HashMap::new();

    for item in completed(sales).flat_map(|sale| sale.items.iter()) {
        let entry = by_product
            .entry(item.product_id.as_str())
            .or_insert_with(|| BestSeller {
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                quantity: 0,
                total_sales: Money::zero(),
            });
        entry.quantity += item.quantity;
        entry.total_sales += item.line_total();
    }

    let mut ranked: Vec<BestSeller> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    ranked.truncate(limit);
    ranked
}

/// Count and total per payment mode, in `PaymentMode::ALL` order.
pub fn sales_by_payment_method(sales: &[Sale]) -> Vec<PaymentMethodTotal> {
    PaymentMode::ALL
        .iter()
        .map(|&method| {
            let (count, total) = completed(sales)
                .filter(|sale| sale.payment_method == method)
                .fold((0usize, Money::zero()), |(n, sum), sale| {
                    (n + 1, sum + sale.total())
                });
            PaymentMethodTotal {
                method,
                count,
                total,
            }
        })
        .collect()
}

/// Cash and EFT taken.
///
/// Cash and EFT sales count at their sale total. Split sales contribute the
/// cash and EFT amounts recorded on the tender, which can exceed the total
/// when change was given.
pub fn tender_totals(sales: &[Sale]) -> TenderTotals {
    completed(sales).fold(TenderTotals::default(), |mut acc, sale| {
        match sale.payment_method {
            PaymentMode::Cash => acc.cash += sale.total(),
            PaymentMode::Eft => acc.eft += sale.total(),
            PaymentMode::Split => {
                acc.cash += sale.payment.cash_amount.unwrap_or_default();
                acc.eft += sale.payment.eft_amount.unwrap_or_default();
            }
        }
        acc
    })
}

/// Totals bucketed by the UTC hour of the sale, always 24 entries.
pub fn sales_by_hour(sales: &[Sale]) -> Vec<HourlyTotal> {
    let mut buckets = [Money::zero(); 24];
    for sale in completed(sales) {
        buckets[sale.date.hour() as usize] += sale.total();
    }

    buckets
        .iter()
        .enumerate()
        .map(|(hour, &total)| HourlyTotal {
            hour: hour as u32,
            total,
        })
        .collect()
}

/// Integer division rounded half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };
    rounded as i64
}

// =============================================================================
// Unit Tests
// =============================================================================
