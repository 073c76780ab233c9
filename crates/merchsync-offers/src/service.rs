//! Offer CRUD over the coupon store.
//!
//! All three operations are batch-shaped: per-item failures land in an
//! `errors` vec while sibling items proceed. Get and delete are gated on
//! the Facebook-managed marker — a coupon the merchant created directly is
//! reported as not-found even when the code matches.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use merchsync_db::{settings, CouponRow, DbError, NewCoupon};

use crate::error::{ErrorType, ItemError, OfferApiError};
use crate::payload::{parse_offer_item, Discount, ValidatedOffer, OFFER_CLASS_ORDER};

const DISCOUNT_TYPE_PERCENT: &str = "percent";
const DISCOUNT_TYPE_FIXED: &str = "fixed_amount";

/// Wire representation of one offer.
#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub code: String,
    pub percent_off: Option<f64>,
    pub fixed_amount_off: Option<FixedAmountView>,
    pub offer_class: &'static str,
    pub end_time: Option<i64>,
    pub usage_limit: i32,
    pub usage_count: i32,
    pub email_restriction: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixedAmountView {
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateResult {
    pub created_offers: Vec<OfferView>,
    #[serde(skip)]
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Default, Serialize)]
pub struct GetResult {
    pub offers: Vec<OfferView>,
    #[serde(skip)]
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Default, Serialize)]
pub struct DeleteResult {
    pub deleted_offer_codes: Vec<String>,
    #[serde(skip)]
    pub errors: Vec<ItemError>,
}

/// Checks the two global switches: the merchant's setting and the rollout
/// switch. Both must be on before any per-item work happens.
///
/// # Errors
///
/// Returns [`ErrorType::OfferManagementDisabled`] when either switch is
/// off, or [`ErrorType::Internal`] on a settings-store failure.
pub async fn check_offer_management_enabled(pool: &PgPool) -> Result<(), OfferApiError> {
    let read_flag = |key: &'static str| async move {
        settings::get_flag(pool, key).await.map_err(|e| {
            tracing::error!(error = %e, "settings read failed");
            OfferApiError::new(ErrorType::Internal, "settings store unavailable")
        })
    };

    let merchant_enabled = read_flag(settings::keys::OFFER_MANAGEMENT_ENABLED).await?;
    let rollout_enabled = read_flag(settings::keys::OFFER_MANAGEMENT_ROLLOUT).await?;

    if merchant_enabled && rollout_enabled {
        Ok(())
    } else {
        Err(OfferApiError::new(
            ErrorType::OfferManagementDisabled,
            "offer management is disabled for this store",
        ))
    }
}

/// Creates offers from raw request items, one coupon per valid item.
///
/// Response order of `created_offers` follows input order. A duplicate code
/// produces `ERROR_OFFER_CODE_ALREADY_EXISTS` and performs no mutation.
pub async fn create_offers(pool: &PgPool, items: &[Value]) -> CreateResult {
    let mut result = CreateResult::default();

    for item in items {
        let validated = match parse_offer_item(item) {
            Ok(v) => v,
            Err(e) => {
                result.errors.push(e);
                continue;
            }
        };

        let code = validated.code.clone();
        match merchsync_db::insert_coupon(pool, &new_coupon_from(&validated)).await {
            Ok(row) => result.created_offers.push(view_from_row(&row)),
            Err(DbError::DuplicateCode(_)) => result.errors.push(ItemError::new(
                ErrorType::OfferCodeAlreadyExists,
                Some(code),
                "an offer with this code already exists",
            )),
            Err(e) => {
                tracing::error!(code = %code, error = %e, "offer insert failed");
                result.errors.push(ItemError::new(
                    ErrorType::OfferCreateFailure,
                    Some(code),
                    "offer could not be stored",
                ));
            }
        }
    }

    result
}

/// Looks up offers by code. Codes without the Facebook-managed marker are
/// reported as not-found, identically to missing codes.
pub async fn get_offers(pool: &PgPool, codes: &[String]) -> GetResult {
    let mut result = GetResult::default();

    for code in codes {
        match merchsync_db::get_coupon_by_code(pool, code).await {
            Ok(Some(row)) if row.facebook_managed => result.offers.push(view_from_row(&row)),
            Ok(_) => result.errors.push(not_found(code)),
            Err(e) => {
                tracing::error!(code = %code, error = %e, "offer lookup failed");
                result
                    .errors
                    .push(ItemError::new(ErrorType::Internal, Some(code.clone()), "lookup failed"));
            }
        }
    }

    result
}

/// Deletes offers by code, marker-gated the same way as [`get_offers`].
pub async fn delete_offers(pool: &PgPool, codes: &[String]) -> DeleteResult {
    let mut result = DeleteResult::default();

    for code in codes {
        match merchsync_db::delete_facebook_managed_coupon(pool, code).await {
            Ok(true) => result.deleted_offer_codes.push(code.clone()),
            Ok(false) => result.errors.push(not_found(code)),
            Err(e) => {
                tracing::error!(code = %code, error = %e, "offer delete failed");
                result.errors.push(ItemError::new(
                    ErrorType::OfferDeleteFailure,
                    Some(code.clone()),
                    "offer could not be deleted",
                ));
            }
        }
    }

    result
}

fn not_found(code: &str) -> ItemError {
    ItemError::new(
        ErrorType::OfferNotFound,
        Some(code.to_string()),
        "offer not found",
    )
}

fn new_coupon_from(offer: &ValidatedOffer) -> NewCoupon {
    let (discount_type, amount, currency) = match &offer.discount {
        Discount::PercentOff(p) => (DISCOUNT_TYPE_PERCENT, *p, None),
        Discount::FixedAmountOff { amount, currency } => {
            (DISCOUNT_TYPE_FIXED, *amount, Some(currency.clone()))
        }
    };

    NewCoupon {
        code: offer.code.clone(),
        discount_type: discount_type.to_string(),
        amount,
        currency,
        date_expires: offer.end_time.and_then(to_datetime),
        usage_limit: offer.usage_limit,
        email_restriction: offer.email_restriction.clone(),
        tags: offer.tags.clone(),
        facebook_managed: true,
    }
}

fn to_datetime(unix: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(unix, 0).single()
}

fn view_from_row(row: &CouponRow) -> OfferView {
    let (percent_off, fixed_amount_off) = if row.discount_type == DISCOUNT_TYPE_PERCENT {
        (row.amount.to_f64(), None)
    } else {
        (
            None,
            Some(FixedAmountView {
                amount: format!("{:.2}", row.amount),
                currency: row.currency.clone().unwrap_or_default(),
            }),
        )
    };

    let tags = row
        .tags
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    OfferView {
        code: row.code.clone(),
        percent_off,
        fixed_amount_off,
        offer_class: OFFER_CLASS_ORDER,
        end_time: row.date_expires.map(|d| d.timestamp()),
        usage_limit: row.usage_limit,
        usage_count: row.usage_count,
        email_restriction: row.email_restriction.clone(),
        tags,
    }
}
