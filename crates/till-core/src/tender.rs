//! # Tender Validation
//!
//! Checks what the customer offered against the cart total and produces a
//! [`TenderBreakdown`], or a [`ValidationError`] saying why not.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CASH   tendered ≥ total                  change = tendered - total    │
//! │                                                                         │
//! │  EFT    reference non-empty               eft = total, change = 0      │
//! │                                                                         │
//! │  SPLIT  cash ≥ 0                                                        │
//! │         eft ≥ 0   (derived: max(0, total - cash) unless forced)        │
//! │         cash + eft ≥ total                                              │
//! │         reference non-empty               change = cash + eft - total  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each mode is validated on its own; nothing carries over between modes.
//! A field that does not parse as an amount fails the same way an
//! insufficient amount does: with a `ValidationError`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentMode, TenderBreakdown};

/// Raw tender as entered on the payment screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[ts(export)]
pub enum TenderInput {
    Cash {
        tendered: String,
    },
    Eft {
        reference: String,
    },
    /// Only the cash figure is edited; `eft: None` means the EFT portion is
    /// derived from the total.
    Split {
        cash: String,
        eft: Option<String>,
        reference: String,
    },
}

impl TenderInput {
    pub fn mode(&self) -> PaymentMode {
        match self {
            TenderInput::Cash { .. } => PaymentMode::Cash,
            TenderInput::Eft { .. } => PaymentMode::Eft,
            TenderInput::Split { .. } => PaymentMode::Split,
        }
    }

    pub fn cash(tendered: impl Into<String>) -> Self {
        TenderInput::Cash {
            tendered: tendered.into(),
        }
    }

    pub fn eft(reference: impl Into<String>) -> Self {
        TenderInput::Eft {
            reference: reference.into(),
        }
    }

    /// Split tender with the EFT portion derived from the total.
    pub fn split(cash: impl Into<String>, reference: impl Into<String>) -> Self {
        TenderInput::Split {
            cash: cash.into(),
            eft: None,
            reference: reference.into(),
        }
    }
}

/// EFT portion of a split tender for a given cash figure.
///
/// ```rust
/// use till_core::money::Money;
/// use till_core::tender::derive_split_eft;
///
/// let total = Money::from_cents(10000);
/// assert_eq!(derive_split_eft(total, Money::from_cents(6000)).cents(), 4000);
/// assert_eq!(derive_split_eft(total, Money::from_cents(15000)).cents(), 0);
/// ```
pub fn derive_split_eft(total: Money, cash: Money) -> Money {
    total.saturating_remainder(cash)
}

/// Validates a tender against `total`.
pub fn validate_tender(
    total: Money,
    input: &TenderInput,
) -> Result<TenderBreakdown, ValidationError> {
    match input {
        TenderInput::Cash { tendered } => validate_cash(total, tendered),
        TenderInput::Eft { reference } => validate_eft(total, reference),
        TenderInput::Split {
            cash,
            eft,
            reference,
        } => validate_split(total, cash, eft.as_deref(), reference),
    }
}

fn validate_cash(total: Money, tendered: &str) -> Result<TenderBreakdown, ValidationError> {
    const FIELD: &str = "cash amount";

    let cash = Money::parse_amount(FIELD, tendered)?;
    if cash < total {
        return Err(ValidationError::InsufficientAmount {
            field: FIELD.to_string(),
            required: total,
            offered: cash,
        });
    }

    Ok(TenderBreakdown {
        mode: PaymentMode::Cash,
        cash_amount: Some(cash),
        eft_amount: None,
        reference: None,
        change_amount: cash - total,
    })
}

fn validate_eft(total: Money, reference: &str) -> Result<TenderBreakdown, ValidationError> {
    let reference = require_reference(reference)?;

    Ok(TenderBreakdown {
        mode: PaymentMode::Eft,
        cash_amount: None,
        eft_amount: Some(total),
        reference: Some(reference),
        change_amount: Money::zero(),
    })
}

fn validate_split(
    total: Money,
    cash: &str,
    eft: Option<&str>,
    reference: &str,
) -> Result<TenderBreakdown, ValidationError> {
    let cash = non_negative("split cash amount", cash)?;
    let eft = match eft {
        Some(forced) => non_negative("split EFT amount", forced)?,
        None => derive_split_eft(total, cash),
    };

    let paid = cash + eft;
    if paid < total {
        return Err(ValidationError::InsufficientAmount {
            field: "total split payment".to_string(),
            required: total,
            offered: paid,
        });
    }

    let reference = require_reference(reference)?;

    Ok(TenderBreakdown {
        mode: PaymentMode::Split,
        cash_amount: Some(cash),
        eft_amount: Some(eft),
        reference: Some(reference),
        change_amount: paid - total,
    })
}

fn non_negative(field: &str, input: &str) -> Result<Money, ValidationError> {
    let amount = Money::parse_amount(field, input)?;
    if amount.is_negative() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    Ok(amount)
}

fn require_reference(reference: &str) -> Result<String, ValidationError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ValidationError::Required {
            field: "EFT reference".to_string(),
        });
    }
    Ok(reference.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_cash_exact() {
        let b = validate_tender(cents(4250), &TenderInput::cash("42.50")).unwrap();
        assert_eq!(b.mode, PaymentMode::Cash);
        assert_eq!(b.cash_amount, Some(cents(4250)));
        assert_eq!(b.eft_amount, None);
        assert_eq!(b.reference, None);
        assert!(b.change_amount.is_zero());
    }

    #[test]
    fn test_cash_short() {
        let err = validate_tender(cents(4250), &TenderInput::cash("40.00")).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientAmount { .. }));
    }

    #[test]
    fn test_cash_with_change() {
        let b = validate_tender(cents(4250), &TenderInput::cash("50.00")).unwrap();
        assert_eq!(b.change_amount, cents(750));
    }

    #[test]
    fn test_cash_not_a_number() {
        let err = validate_tender(cents(4250), &TenderInput::cash("fifty")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));

        let err = validate_tender(cents(4250), &TenderInput::cash("")).unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_eft_assumes_full_total() {
        let b = validate_tender(cents(1999), &TenderInput::eft(" AUTH-123 ")).unwrap();
        assert_eq!(b.mode, PaymentMode::Eft);
        assert_eq!(b.cash_amount, None);
        assert_eq!(b.eft_amount, Some(cents(1999)));
        assert_eq!(b.reference.as_deref(), Some("AUTH-123"));
        assert!(b.change_amount.is_zero());
    }

    #[test]
    fn test_eft_requires_reference() {
        for reference in ["", "   "] {
            let err = validate_tender(cents(1999), &TenderInput::eft(reference)).unwrap_err();
            assert!(matches!(err, ValidationError::Required { .. }));
        }
    }

    #[test]
    fn test_split_derives_eft() {
        let b = validate_tender(cents(10000), &TenderInput::split("60.00", "REF-1")).unwrap();
        assert_eq!(b.cash_amount, Some(cents(6000)));
        assert_eq!(b.eft_amount, Some(cents(4000)));
        assert_eq!(b.paid(), cents(10000));
        assert!(b.change_amount.is_zero());
    }

    #[test]
    fn test_split_cash_over_total_gives_change() {
        let b = validate_tender(cents(10000), &TenderInput::split("120", "REF-1")).unwrap();
        assert_eq!(b.eft_amount, Some(Money::zero()));
        assert_eq!(b.change_amount, cents(2000));
    }

    #[test]
    fn test_split_forced_eft_short() {
        let input = TenderInput::Split {
            cash: "30.00".to_string(),
            eft: Some("0".to_string()),
            reference: "REF-1".to_string(),
        };
        let err = validate_tender(cents(10000), &input).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientAmount { .. }));
    }

    #[test]
    fn test_split_rejects_negative_cash() {
        let err = validate_tender(cents(10000), &TenderInput::split("-5", "REF-1")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_split_rejects_bad_forced_eft() {
        let input = TenderInput::Split {
            cash: "30.00".to_string(),
            eft: Some("seventy".to_string()),
            reference: "REF-1".to_string(),
        };
        assert!(validate_tender(cents(10000), &input).is_err());
    }

    #[test]
    fn test_split_requires_reference() {
        let err = validate_tender(cents(10000), &TenderInput::split("60.00", "")).unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_input_mode() {
        assert_eq!(TenderInput::cash("1").mode(), PaymentMode::Cash);
        assert_eq!(TenderInput::eft("r").mode(), PaymentMode::Eft);
        assert_eq!(TenderInput::split("1", "r").mode(), PaymentMode::Split);
    }
}
