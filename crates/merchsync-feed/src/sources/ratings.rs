//! Batch source for the ratings-and-reviews feed.

use std::collections::HashMap;

use async_trait::async_trait;
use merchsync_db::ReviewRow;
use sqlx::PgPool;

use super::StoreInfo;
use crate::generator::{BatchSource, DEFAULT_BATCH_SIZE};
use crate::writer::FeedRow;
use crate::FeedError;

/// Column order Meta expects for ratings-and-reviews artifacts.
pub const RATINGS_HEADER: [&str; 15] = [
    "aggregator",
    "store.name",
    "store.id",
    "store.storeUrls",
    "review_id",
    "rating",
    "title",
    "content",
    "created_at",
    "reviewer.name",
    "reviewer.reviewerID",
    "reviewer.isAnonymous",
    "product.name",
    "product.url",
    "product.productIdentifiers.skus",
];

const AGGREGATOR: &str = "merchsync";

/// Pages approved reviews out of the store, 100 at a time.
pub struct RatingsSource {
    pool: PgPool,
}

impl RatingsSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchSource for RatingsSource {
    fn header(&self) -> &'static [&'static str] {
        &RATINGS_HEADER
    }

    async fn items_for_batch(&self, batch_number: u64) -> Result<Vec<FeedRow>, FeedError> {
        let limit = i64::try_from(self.batch_size()).unwrap_or(i64::MAX);
        let offset = i64::try_from(batch_number).unwrap_or(i64::MAX).saturating_mul(limit);

        let store = StoreInfo::load(&self.pool).await?;
        let reviews = merchsync_db::list_approved_reviews(&self.pool, limit, offset).await?;
        Ok(reviews
            .iter()
            .map(|review| map_review_row(review, &store))
            .collect())
    }

    fn batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }
}

fn map_review_row(review: &ReviewRow, store: &StoreInfo) -> FeedRow {
    let mut row = HashMap::new();
    row.insert("aggregator".to_string(), AGGREGATOR.to_string());
    row.insert("store.name".to_string(), store.name.clone());
    row.insert("store.id".to_string(), store.catalog_id.clone());
    row.insert("store.storeUrls".to_string(), store.url.clone());
    row.insert("review_id".to_string(), review.id.to_string());
    row.insert("rating".to_string(), review.rating.to_string());
    row.insert("title".to_string(), review.title.clone().unwrap_or_default());
    row.insert("content".to_string(), review.content.clone());
    row.insert("created_at".to_string(), review.created_at.to_rfc3339());
    row.insert("reviewer.name".to_string(), review.reviewer_name.clone());
    row.insert(
        "reviewer.reviewerID".to_string(),
        review.reviewer_id.clone().unwrap_or_default(),
    );
    row.insert(
        "reviewer.isAnonymous".to_string(),
        review.is_anonymous.to_string(),
    );
    row.insert("product.name".to_string(), review.product_name.clone());
    row.insert("product.url".to_string(), review.product_url.clone());
    row.insert(
        "product.productIdentifiers.skus".to_string(),
        review.product_sku.clone().unwrap_or_default(),
    );
    row
}
