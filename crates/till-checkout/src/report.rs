//! Sales report for the reporting screen, loaded from a [`SaleStore`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

use till_core::report::{
    best_sellers, period_bounds, sales_by_hour, sales_by_payment_method, summarize,
    tender_totals, BestSeller, HourlyTotal, PaymentMethodTotal, ReportPeriod, SalesSummary,
    TenderTotals,
};
use till_core::Sale;

use crate::error::{CheckoutError, CheckoutResult};
use crate::store::SaleStore;

/// Products listed under best sellers.
pub const BEST_SELLER_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesReport {
    pub period: ReportPeriod,
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
    pub summary: SalesSummary,
    pub best_sellers: Vec<BestSeller>,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub tenders: TenderTotals,
    pub by_hour: Vec<HourlyTotal>,
    /// Every sale in the range, newest first.
    pub sales: Vec<Sale>,
}

impl SalesReport {
    pub fn from_sales(
        period: ReportPeriod,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sales: Vec<Sale>,
    ) -> Self {
        SalesReport {
            period,
            start,
            end,
            summary: summarize(&sales),
            best_sellers: best_sellers(&sales, BEST_SELLER_LIMIT),
            by_payment_method: sales_by_payment_method(&sales),
            tenders: tender_totals(&sales),
            by_hour: sales_by_hour(&sales),
            sales,
        }
    }
}

/// Loads and aggregates the sales of the period containing `date`.
pub async fn load_report<S: SaleStore>(
    sales: &S,
    period: ReportPeriod,
    date: NaiveDate,
) -> CheckoutResult<SalesReport> {
    let (start, end) = period_bounds(period, date);
    debug!(?period, %start, %end, "Loading sales report");

    let found = sales
        .find_all(Some(start), Some(end))
        .await
        .map_err(CheckoutError::Persistence)?;

    Ok(SalesReport::from_sales(period, start, end, found))
}
