//! The `settings` table: a key-value store for runtime-mutable state.
//!
//! Feed URL secrets, Meta feed IDs, the catalog ID, the offer-management
//! public keys, and the offer-management flags all live here so they can be
//! changed without a restart. Secrets use [`init_if_absent`] so the first
//! reader creates them and every later reader sees the same value.

use sqlx::PgPool;

use crate::DbError;

/// Well-known settings keys.
pub mod keys {
    pub const CATALOG_ID: &str = "catalog_id";
    pub const STORE_NAME: &str = "store_name";
    pub const STORE_URL: &str = "store_url";
    pub const OFFER_JWT_PUBLIC_KEY_CURRENT: &str = "offer_jwt_public_key_current";
    pub const OFFER_JWT_PUBLIC_KEY_PREVIOUS: &str = "offer_jwt_public_key_previous";
    pub const OFFER_MANAGEMENT_ENABLED: &str = "offer_management_enabled";
    pub const OFFER_MANAGEMENT_ROLLOUT: &str = "offer_management_rollout";

    /// Per-stream key holding the rotating feed URL secret.
    #[must_use]
    pub fn feed_url_secret(stream: &str) -> String {
        format!("feed_url_secret_{stream}")
    }

    /// Per-stream key holding the Meta-side feed ID used for upload pings.
    #[must_use]
    pub fn meta_feed_id(stream: &str) -> String {
        format!("meta_feed_id_{stream}")
    }
}

/// Returns the value for `key`, or `None` if unset.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, DbError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Sets `key` to `value`, overwriting any existing value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn put(pool: &PgPool, key: &str, value: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Stores `value` under `key` only if the key is absent, and returns the
/// stored value either way.
///
/// The insert races safely: under concurrent callers exactly one write
/// happens and all callers observe the same winning value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn init_if_absent(pool: &PgPool, key: &str, value: &str) -> Result<String, DbError> {
    let inserted = sqlx::query_scalar::<_, String>(
        "INSERT INTO settings (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO NOTHING \
         RETURNING value",
    )
    .bind(key)
    .bind(value)
    .fetch_optional(pool)
    .await?;

    if let Some(v) = inserted {
        return Ok(v);
    }

    // Conflict path: another writer (or an earlier call) owns the value.
    get(pool, key).await?.ok_or(DbError::NotFound)
}

/// Reads a boolean flag. Missing keys and unrecognized values are `false`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_flag(pool: &PgPool, key: &str) -> Result<bool, DbError> {
    let value = get(pool, key).await?;
    Ok(value
        .as_deref()
        .is_some_and(|v| matches!(v, "1" | "true" | "yes")))
}
