//! Database-backed tests for the feed orchestrator lifecycle: lazy secret
//! establishment, rotation, self-healing serve, and generated content.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use merchsync_core::streams;
use merchsync_db::settings;
use merchsync_feed::{Feed, FeedError, GenerationStrategy};

mod support {
    use super::*;
    use merchsync_feed::sources::RatingsSource;

    pub fn ratings_feed(pool: PgPool, feed_dir: &std::path::Path) -> Feed {
        Feed::new(
            streams::RATINGS_AND_REVIEWS,
            streams::FEED_TYPE_RATINGS,
            Duration::from_secs(3600),
            feed_dir,
            GenerationStrategy::Batched,
            Arc::new(RatingsSource::new(pool.clone())),
            pool,
        )
    }
}

async fn seed_review(pool: &PgPool, product_id: i64, status: &str, content: &str) {
    sqlx::query(
        "INSERT INTO product_reviews \
         (product_id, product_name, product_url, rating, content, reviewer_name, status) \
         VALUES ($1, $2, $3, 5, $4, 'Sam', $5)",
    )
    .bind(product_id)
    .bind(format!("Product {product_id}"))
    .bind(format!("https://shop.example.com/p/{product_id}"))
    .bind(content)
    .bind(status)
    .execute(pool)
    .await
    .expect("insert review");
}

#[sqlx::test(migrations = "../../migrations")]
async fn secret_is_established_once_and_reused(pool: PgPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let feed = support::ratings_feed(pool.clone(), dir.path());

    let first = feed.secret().await.expect("first secret");
    let second = feed.secret().await.expect("second secret");
    assert_eq!(first, second);

    let stored = settings::get(
        &pool,
        &settings::keys::feed_url_secret(streams::RATINGS_AND_REVIEWS),
    )
        .await
        .expect("settings read")
        .expect("secret stored");
    assert_eq!(stored, first);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rotation_invalidates_old_secret_and_url(pool: PgPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let feed = support::ratings_feed(pool.clone(), dir.path());

    let old_secret = feed.secret().await.expect("secret");
    feed.serve(&old_secret).await.expect("serve with old secret");

    let new_secret = feed.rotate_secret().await.expect("rotate");
    assert_ne!(old_secret, new_secret);

    let err = feed.serve(&old_secret).await.expect_err("old secret dead");
    assert!(matches!(err, FeedError::InvalidSecret));

    let url = feed
        .data_url("https://shop.example.com")
        .await
        .expect("data url");
    assert!(url.contains(&new_secret));
    assert!(!url.contains(&old_secret));
}

#[sqlx::test(migrations = "../../migrations")]
async fn serve_builds_missing_artifact_before_validating(pool: PgPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let feed = support::ratings_feed(pool.clone(), dir.path());
    seed_review(&pool, 7, "approved", "Great product").await;

    // No regenerate was ever run; the pull itself must produce the file.
    let secret = feed.secret().await.expect("secret");
    let served = feed.serve(&secret).await.expect("self-healing serve");

    let text = String::from_utf8(served.bytes).expect("utf8");
    let mut lines = text.lines();
    assert!(lines.next().expect("header").starts_with("aggregator"));
    assert!(lines.next().expect("data row").contains("Great product"));

    // A bad secret is still rejected even though the artifact now exists.
    let err = feed.serve("not-the-secret").await.expect_err("bad secret");
    assert!(matches!(err, FeedError::InvalidSecret));
}

#[sqlx::test(migrations = "../../migrations")]
async fn regenerate_includes_only_approved_reviews(pool: PgPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let feed = support::ratings_feed(pool.clone(), dir.path());

    seed_review(&pool, 1, "approved", "Keep me").await;
    seed_review(&pool, 2, "pending", "Drop me").await;
    seed_review(&pool, 3, "rejected", "Drop me too").await;

    let report = feed.regenerate().await.expect("regenerate");
    assert_eq!(report.rows, 1);

    let bytes = tokio::fs::read(&report.path).await.expect("read artifact");
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("Keep me"));
    assert!(!text.contains("Drop me"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn regenerate_replaces_artifact_atomically_by_rename(pool: PgPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let feed = support::ratings_feed(pool.clone(), dir.path());

    seed_review(&pool, 1, "approved", "First pass").await;
    let first = feed.regenerate().await.expect("first regenerate");

    seed_review(&pool, 2, "approved", "Second pass").await;
    let second = feed.regenerate().await.expect("second regenerate");

    // Same final path both times; the content is fully replaced.
    assert_eq!(first.path, second.path);
    let text = String::from_utf8(tokio::fs::read(&second.path).await.expect("read"))
        .expect("utf8");
    assert!(text.contains("First pass"));
    assert!(text.contains("Second pass"));

    // No leftover temp files after a committed generation.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".csv") && !second.path.ends_with(name))
        .collect();
    assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
}
