//! Per-item validation of create-offer payloads.
//!
//! Items arrive as loosely-typed JSON objects: Meta may send a batch where
//! a single field of a single item is junk, and that item alone must fail.
//! Everything here is pure so the rules are testable without a store.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{ErrorType, ItemError};

pub const OFFER_CLASS_ORDER: &str = "order";

const EXACTLY_ONE_DISCOUNT: &str =
    "Exactly one of fixed amount off or percent off must be provided";

/// A create-offer item that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOffer {
    pub code: String,
    pub discount: Discount,
    pub end_time: Option<i64>,
    pub usage_limit: i32,
    pub email_restriction: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discount {
    /// Percentage discount in (0, 100].
    PercentOff(Decimal),
    /// Fixed amount off the order total.
    FixedAmountOff { amount: Decimal, currency: String },
}

/// Validates one raw create-offer item.
///
/// # Errors
///
/// Returns an [`ItemError`] describing the first rule the item violates;
/// the caller collects it and moves on to the sibling items.
pub fn parse_offer_item(item: &Value) -> Result<ValidatedOffer, ItemError> {
    let code = extract_code(item)?;
    let fail = |message: String| {
        ItemError::new(ErrorType::OfferCreateFailure, Some(code.clone()), message)
    };

    let obj = item
        .as_object()
        .ok_or_else(|| fail("offer must be an object".to_string()))?;

    let discount = extract_discount(obj, &fail)?;

    let offer_class = obj
        .get("offer_class")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if offer_class != OFFER_CLASS_ORDER {
        return Err(fail(format!(
            "offer_class must be \"{OFFER_CLASS_ORDER}\""
        )));
    }

    let end_time = match obj.get("end_time") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_i64()
                .ok_or_else(|| fail("end_time must be a unix timestamp".to_string()))?,
        ),
    };

    let usage_limit = match obj.get("usage_limit") {
        None | Some(Value::Null) => 0,
        Some(v) => {
            let n = v
                .as_i64()
                .filter(|n| *n >= 0)
                .ok_or_else(|| fail("usage_limit must be a non-negative integer".to_string()))?;
            i32::try_from(n)
                .map_err(|_| fail("usage_limit must be a non-negative integer".to_string()))?
        }
    };

    let email_restriction = match obj.get("email_restriction") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_str()
                .map(ToOwned::to_owned)
                .ok_or_else(|| fail("email_restriction must be a string".to_string()))?,
        ),
    };

    let tags = match obj.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => v
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|t| t.as_str().map(ToOwned::to_owned))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| fail("tags must be a list of strings".to_string()))?,
    };

    Ok(ValidatedOffer {
        code,
        discount,
        end_time,
        usage_limit,
        email_restriction,
        tags,
    })
}

fn extract_code(item: &Value) -> Result<String, ItemError> {
    item.get("code")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ItemError::new(
                ErrorType::OfferCreateFailure,
                None,
                "offer code is required",
            )
        })
}

fn extract_discount(
    obj: &serde_json::Map<String, Value>,
    fail: &impl Fn(String) -> ItemError,
) -> Result<Discount, ItemError> {
    let percent = obj.get("percent_off").filter(|v| !v.is_null());
    let fixed = obj.get("fixed_amount_off").filter(|v| !v.is_null());

    match (percent, fixed) {
        (Some(_), Some(_)) | (None, None) => Err(fail(EXACTLY_ONE_DISCOUNT.to_string())),
        (Some(p), None) => {
            let value = parse_decimal(p)
                .ok_or_else(|| fail("percent_off must be a number".to_string()))?;
            if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(fail("percent_off must be between 0 and 100".to_string()));
            }
            Ok(Discount::PercentOff(value))
        }
        (None, Some(f)) => {
            let amount = f
                .get("amount")
                .and_then(parse_decimal)
                .ok_or_else(|| fail("fixed_amount_off.amount must be numeric".to_string()))?;
            if amount <= Decimal::ZERO {
                return Err(fail("fixed_amount_off.amount must be positive".to_string()));
            }
            let currency = f
                .get("currency")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| fail("fixed_amount_off.currency is required".to_string()))?;
            Ok(Discount::FixedAmountOff {
                amount,
                currency: currency.to_string(),
            })
        }
    }
}

/// Accepts JSON numbers and numeric strings, mirroring the lenient inputs
/// Meta sends.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok().filter(|_| !s.trim().is_empty()),
        _ => None,
    }
}
