//! Database operations for the `product_reviews` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `product_reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_url: String,
    pub product_sku: Option<String>,
    pub rating: i16,
    pub title: Option<String>,
    pub content: String,
    pub reviewer_name: String,
    pub reviewer_id: Option<String>,
    pub is_anonymous: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Returns one page of approved reviews, ordered by id so repeated calls
/// with the same offset see the same page.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_approved_reviews(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, product_id, product_name, product_url, product_sku, rating, title, \
                content, reviewer_name, reviewer_id, is_anonymous, status, created_at \
         FROM product_reviews \
         WHERE status = 'approved' \
         ORDER BY id \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Counts approved reviews.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_approved_reviews(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM product_reviews WHERE status = 'approved'",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}
