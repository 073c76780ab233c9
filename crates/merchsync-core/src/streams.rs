//! Canonical names for the data streams merchsync exports to Meta.
//!
//! A stream name is the stable, URL-safe key for one feed: it appears in
//! settings keys, artifact filenames, and the public pull URL. The Meta-side
//! feed type is the enum string the Graph API expects for that stream.

/// Stream name for the ratings-and-reviews feed.
pub const RATINGS_AND_REVIEWS: &str = "ratings_and_reviews";

/// Stream name for the product catalog feed.
pub const PRODUCT_CATALOG: &str = "product_catalog";

/// Meta-side feed type for ratings and reviews.
pub const FEED_TYPE_RATINGS: &str = "PRODUCT_RATINGS_AND_REVIEWS";

/// Meta-side feed type for the product catalog.
pub const FEED_TYPE_PRODUCTS: &str = "PRODUCTS";
