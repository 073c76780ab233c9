//! Concrete batch sources, one module per data stream.

mod catalog;
mod ratings;

pub use catalog::{CatalogSource, CATALOG_HEADER};
pub use ratings::{RatingsSource, RATINGS_HEADER};

use merchsync_db::settings;
use sqlx::PgPool;

use crate::FeedError;

/// Merchant identity fields stitched into every ratings row.
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub name: String,
    pub catalog_id: String,
    pub url: String,
}

impl StoreInfo {
    /// Loads store identity from settings. Missing keys come back empty
    /// rather than failing generation; Meta tolerates blank store fields.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Db`] if a settings read fails.
    pub async fn load(pool: &PgPool) -> Result<Self, FeedError> {
        let name = settings::get(pool, settings::keys::STORE_NAME)
            .await?
            .unwrap_or_default();
        let catalog_id = settings::get(pool, settings::keys::CATALOG_ID)
            .await?
            .unwrap_or_default();
        let url = settings::get(pool, settings::keys::STORE_URL)
            .await?
            .unwrap_or_default();
        Ok(Self {
            name,
            catalog_id,
            url,
        })
    }
}
