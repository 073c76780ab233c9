//! Database operations for the `coupons` table — the offer store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `coupons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CouponRow {
    pub id: i64,
    pub code: String,
    /// `percent` or `fixed_amount`.
    pub discount_type: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub date_expires: Option<DateTime<Utc>>,
    pub usage_limit: i32,
    pub usage_count: i32,
    pub email_restriction: Option<String>,
    pub tags: serde_json::Value,
    pub facebook_managed: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for [`insert_coupon`].
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub date_expires: Option<DateTime<Utc>>,
    pub usage_limit: i32,
    pub email_restriction: Option<String>,
    pub tags: Vec<String>,
    pub facebook_managed: bool,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

const COUPON_COLUMNS: &str = "id, code, discount_type, amount, currency, date_expires, \
     usage_limit, usage_count, email_restriction, tags, facebook_managed, created_at";

/// Inserts a new coupon and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::DuplicateCode`] if the code is already taken, or
/// [`DbError::Sqlx`] for any other failure. A duplicate code performs no
/// mutation at all.
pub async fn insert_coupon(pool: &PgPool, coupon: &NewCoupon) -> Result<CouponRow, DbError> {
    let tags = serde_json::Value::from(coupon.tags.clone());

    let result = sqlx::query_as::<_, CouponRow>(&format!(
        "INSERT INTO coupons \
             (code, discount_type, amount, currency, date_expires, usage_limit, \
              email_restriction, tags, facebook_managed) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {COUPON_COLUMNS}",
    ))
    .bind(&coupon.code)
    .bind(&coupon.discount_type)
    .bind(coupon.amount)
    .bind(&coupon.currency)
    .bind(coupon.date_expires)
    .bind(coupon.usage_limit)
    .bind(&coupon.email_restriction)
    .bind(&tags)
    .bind(coupon.facebook_managed)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(DbError::DuplicateCode(coupon.code.clone()))
        }
        Err(e) => Err(DbError::Sqlx(e)),
    }
}

/// Returns the coupon with the given code, or `None`.
///
/// Provenance filtering (the Facebook-managed marker) is the caller's
/// responsibility; this returns the row regardless of origin.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_coupon_by_code(pool: &PgPool, code: &str) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1",
    ))
    .bind(code)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deletes the coupon with the given code if and only if it carries the
/// Facebook-managed marker. Returns whether a row was deleted.
///
/// An unmarked coupon with a matching code is left untouched, so to the
/// caller it is indistinguishable from a missing code.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_facebook_managed_coupon(pool: &PgPool, code: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM coupons WHERE code = $1 AND facebook_managed = true")
        .bind(code)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
