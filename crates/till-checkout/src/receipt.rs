//! Receipt built from a completed sale.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use till_core::{PaymentMode, Sale};

use crate::config::CheckoutConfig;

/// Length of the receipt number printed for a sale.
const RECEIPT_NUMBER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Receipt {
    pub sale_id: String,
    /// First characters of the sale id
    pub receipt_number: String,
    pub store_name: String,
    pub timestamp: String,
    pub items: Vec<ReceiptItem>,
    pub subtotal_cents: i64,
    /// GST included in the total
    pub tax_cents: i64,
    pub total_cents: i64,
    /// "Cash", "EFT" or "Split Payment"
    pub payment_method: String,
    pub payments: Vec<ReceiptPayment>,
    pub change_cents: i64,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptPayment {
    pub method: String,
    pub amount_cents: i64,
}

impl Receipt {
    pub fn from_sale(sale: &Sale, config: &CheckoutConfig) -> Self {
        let payment = &sale.payment;

        let mut payments = Vec::with_capacity(2);
        if let Some(cash) = payment.cash_amount {
            payments.push(ReceiptPayment {
                method: PaymentMode::Cash.label().to_string(),
                amount_cents: cash.cents(),
            });
        }
        if let Some(eft) = payment.eft_amount {
            payments.push(ReceiptPayment {
                method: PaymentMode::Eft.label().to_string(),
                amount_cents: eft.cents(),
            });
        }

        Receipt {
            sale_id: sale.id.clone(),
            receipt_number: sale.id.chars().take(RECEIPT_NUMBER_LEN).collect(),
            store_name: config.store_name.clone(),
            timestamp: sale.date.to_rfc3339(),
            items: sale
                .items
                .iter()
                .map(|i| ReceiptItem {
                    name: i.product_name.clone(),
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                    line_total_cents: i.line_total_cents,
                })
                .collect(),
            subtotal_cents: sale.subtotal_cents,
            tax_cents: sale.tax_cents,
            total_cents: sale.total_cents,
            payment_method: sale.payment_method.label().to_string(),
            payments,
            change_cents: payment.change_amount.cents(),
            reference: payment.reference.clone(),
        }
    }

    /// Plain-text rendering for a receipt printer or a log line.
    pub fn to_text(&self, config: &CheckoutConfig) -> String {
        let money = |cents: i64| config.format_currency(cents);
        let mut lines = vec![
            self.store_name.clone(),
            format!("Receipt #{}", self.receipt_number),
            self.timestamp.clone(),
            String::new(),
        ];

        for item in &self.items {
            lines.push(format!(
                "{} x{} @ {} = {}",
                item.name,
                item.quantity,
                money(item.unit_price_cents),
                money(item.line_total_cents)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Subtotal: {}", money(self.subtotal_cents)));
        lines.push(format!("GST included: {}", money(self.tax_cents)));
        lines.push(format!("Total: {}", money(self.total_cents)));
        lines.push(format!("Paid by: {}", self.payment_method));
        for payment in &self.payments {
            lines.push(format!("  {}: {}", payment.method, money(payment.amount_cents)));
        }
        if self.change_cents > 0 {
            lines.push(format!("Change: {}", money(self.change_cents)));
        }
        if let Some(reference) = &self.reference {
            lines.push(format!("Ref: {reference}"));
        }

        lines.join("\n")
    }
}
