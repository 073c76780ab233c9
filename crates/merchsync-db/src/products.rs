//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub availability: String,
    pub condition: String,
    pub price: Decimal,
    pub currency: String,
    pub link: String,
    pub image_link: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns one page of active products, ordered by id for stable paging.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_products(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, external_id, title, description, availability, condition, price, \
                currency, link, image_link, brand, sku, is_active, created_at, updated_at \
         FROM products \
         WHERE is_active = true \
         ORDER BY id \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Counts active products.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_products(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE is_active = true")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
