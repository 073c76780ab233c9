//! Batch source for the product catalog feed.

use std::collections::HashMap;

use async_trait::async_trait;
use merchsync_db::ProductRow;
use sqlx::PgPool;

use crate::generator::{BatchSource, DEFAULT_BATCH_SIZE};
use crate::writer::FeedRow;
use crate::FeedError;

/// Column order Meta expects for product catalog artifacts.
pub const CATALOG_HEADER: [&str; 10] = [
    "id",
    "title",
    "description",
    "availability",
    "condition",
    "price",
    "link",
    "image_link",
    "brand",
    "sku",
];

/// Pages active products out of the store, 100 at a time.
pub struct CatalogSource {
    pool: PgPool,
}

impl CatalogSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchSource for CatalogSource {
    fn header(&self) -> &'static [&'static str] {
        &CATALOG_HEADER
    }

    async fn items_for_batch(&self, batch_number: u64) -> Result<Vec<FeedRow>, FeedError> {
        let limit = i64::try_from(self.batch_size()).unwrap_or(i64::MAX);
        let offset = i64::try_from(batch_number).unwrap_or(i64::MAX).saturating_mul(limit);

        let products = merchsync_db::list_active_products(&self.pool, limit, offset).await?;
        Ok(products.iter().map(map_product_row).collect())
    }

    fn batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }
}

fn map_product_row(product: &ProductRow) -> FeedRow {
    let mut row = HashMap::new();
    row.insert("id".to_string(), product.external_id.clone());
    row.insert("title".to_string(), product.title.clone());
    row.insert("description".to_string(), product.description.clone());
    row.insert("availability".to_string(), product.availability.clone());
    row.insert("condition".to_string(), product.condition.clone());
    // Meta's catalog price format: "12.99 USD".
    row.insert(
        "price".to_string(),
        format!("{} {}", product.price.round_dp(2), product.currency),
    );
    row.insert("link".to_string(), product.link.clone());
    row.insert(
        "image_link".to_string(),
        product.image_link.clone().unwrap_or_default(),
    );
    row.insert(
        "brand".to_string(),
        product.brand.clone().unwrap_or_default(),
    );
    row.insert("sku".to_string(), product.sku.clone().unwrap_or_default());
    row
}
