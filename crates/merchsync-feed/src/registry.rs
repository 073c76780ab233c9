//! Explicit stream-name → feed mapping.
//!
//! Scheduler jobs and HTTP handlers dispatch through this registry instead
//! of a string-keyed event bus; an unknown stream is an error, not a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use merchsync_core::{streams, AppConfig};

use crate::sources::{CatalogSource, RatingsSource};
use crate::{Feed, FeedError, GenerationStrategy};

#[derive(Default)]
pub struct FeedRegistry {
    feeds: HashMap<String, Arc<Feed>>,
}

impl FeedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a feed under its stream name. The stream name is the unique
    /// key; registering the same name twice replaces the earlier entry.
    pub fn register(&mut self, feed: Feed) {
        self.feeds
            .insert(feed.stream_name().to_string(), Arc::new(feed));
    }

    /// Resolves a stream name to its feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UnknownStream`] for unregistered names.
    pub fn get(&self, stream_name: &str) -> Result<Arc<Feed>, FeedError> {
        self.feeds
            .get(stream_name)
            .cloned()
            .ok_or_else(|| FeedError::UnknownStream(stream_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Feed>> {
        self.feeds.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

/// Builds the standard registry: ratings-and-reviews plus product catalog,
/// both on the batched strategy.
#[must_use]
pub fn build_registry(pool: PgPool, config: &AppConfig) -> FeedRegistry {
    let mut registry = FeedRegistry::new();

    registry.register(Feed::new(
        streams::RATINGS_AND_REVIEWS,
        streams::FEED_TYPE_RATINGS,
        Duration::from_secs(config.ratings_feed_interval_secs),
        &config.feed_dir,
        GenerationStrategy::Batched,
        Arc::new(RatingsSource::new(pool.clone())),
        pool.clone(),
    ));

    registry.register(Feed::new(
        streams::PRODUCT_CATALOG,
        streams::FEED_TYPE_PRODUCTS,
        Duration::from_secs(config.catalog_feed_interval_secs),
        &config.feed_dir,
        GenerationStrategy::Batched,
        Arc::new(CatalogSource::new(pool.clone())),
        pool,
    ));

    registry
}
