use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Directory feed artifacts are written to and served from.
    pub feed_dir: PathBuf,
    /// Externally reachable base URL used when building feed pull URLs.
    pub public_base_url: String,
    /// Meta Graph API base, overridable for tests.
    pub graph_api_base: String,
    pub meta_access_token: Option<String>,
    pub http_request_timeout_secs: u64,
    pub ratings_feed_interval_secs: u64,
    pub catalog_feed_interval_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("feed_dir", &self.feed_dir)
            .field("public_base_url", &self.public_base_url)
            .field("graph_api_base", &self.graph_api_base)
            .field("database_url", &"[redacted]")
            .field(
                "meta_access_token",
                &self.meta_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("http_request_timeout_secs", &self.http_request_timeout_secs)
            .field(
                "ratings_feed_interval_secs",
                &self.ratings_feed_interval_secs,
            )
            .field(
                "catalog_feed_interval_secs",
                &self.catalog_feed_interval_secs,
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
