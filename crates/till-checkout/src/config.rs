//! # Checkout Configuration
//!
//! Settings loaded once at startup and shared read-only by every session.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TILL_*`)
//! 2. Defaults (this file)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use till_core::{TaxRate, DEFAULT_TAX_RATE_BPS};
use tracing::warn;

/// Checkout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfig {
    /// Store name (printed on receipts)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// GST rate in basis points, e.g. 1000 = 10%
    pub tax_rate_bps: u32,

    /// How many times a stock decrement is tried before the sale is left
    /// for reconciliation. Never less than 1.
    pub stock_update_attempts: u32,

    /// Pause between stock update attempts, in milliseconds
    pub stock_retry_backoff_ms: u64,
}

impl Default for CheckoutConfig {
    /// ## Default Values
    /// - Store: "Till POS Dev Store"
    /// - Currency: $
    /// - Tax: 10% GST, included in prices
    /// - Stock updates: 3 attempts, 50ms apart
    fn default() -> Self {
        CheckoutConfig {
            store_name: "Till POS Dev Store".to_string(),
            currency_symbol: "$".to_string(),
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            stock_update_attempts: 3,
            stock_retry_backoff_ms: 50,
        }
    }
}

impl CheckoutConfig {
    /// Creates a config from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `TILL_STORE_NAME`: Override store name
    /// - `TILL_TAX_RATE`: Override GST rate as a percentage (e.g., "10")
    /// - `TILL_STOCK_UPDATE_ATTEMPTS`: Override stock update attempts
    ///
    /// Values that do not parse are ignored, as is a tax rate that rounds to
    /// 100% or more.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = CheckoutConfig::default();

        if let Some(store_name) = lookup("TILL_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(rate) = lookup("TILL_TAX_RATE") {
            let parsed = rate
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|pct| pct.is_finite() && *pct >= 0.0)
                .map(|pct| TaxRate::new(TaxRate::from_percentage(pct).bps()));

            match parsed {
                Some(Ok(tax_rate)) => config.tax_rate_bps = tax_rate.bps(),
                Some(Err(e)) => warn!(value = %rate, error = %e, "Ignoring invalid TILL_TAX_RATE"),
                None => warn!(value = %rate, "Ignoring invalid TILL_TAX_RATE"),
            }
        }

        if let Some(attempts) = lookup("TILL_STOCK_UPDATE_ATTEMPTS") {
            match attempts.trim().parse::<u32>() {
                Ok(n) if n >= 1 => config.stock_update_attempts = n,
                _ => warn!(value = %attempts, "Ignoring invalid TILL_STOCK_UPDATE_ATTEMPTS"),
            }
        }

        config
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    pub fn stock_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.stock_retry_backoff_ms)
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ```rust
    /// use till_checkout::CheckoutConfig;
    ///
    /// let config = CheckoutConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// assert_eq!(config.format_currency(-50), "-$0.50");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let abs = cents.unsigned_abs();
        format!(
            "{}{}{}.{:02}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            abs / 100,
            abs % 100
        )
    }
}
