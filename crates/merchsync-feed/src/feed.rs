//! The per-stream feed orchestrator.
//!
//! One `Feed` exists per data stream for the process lifetime, held by the
//! [`FeedRegistry`](crate::FeedRegistry). Lifecycle events fire in a fixed
//! order: scheduled → regenerate → generation-complete (upload ping) →
//! data-requested (serve).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use subtle::ConstantTimeEq;

use merchsync_db::settings;

use crate::generator::{run_generation, BatchSource, GenerationStrategy};
use crate::upload::UploadClient;
use crate::writer::FeedFileWriter;
use crate::{CsvFeedWriter, FeedError};

/// Outcome of one regeneration cycle.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub rows: usize,
    pub path: PathBuf,
    pub elapsed: Duration,
}

/// A ready-to-send feed artifact.
#[derive(Debug)]
pub struct ServedFeed {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct Feed {
    stream_name: String,
    feed_type: &'static str,
    gen_interval: Duration,
    feed_dir: PathBuf,
    strategy: GenerationStrategy,
    source: Arc<dyn BatchSource>,
    pool: PgPool,
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("stream_name", &self.stream_name)
            .field("feed_type", &self.feed_type)
            .field("gen_interval", &self.gen_interval)
            .field("feed_dir", &self.feed_dir)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}


impl Feed {
    #[must_use]
    pub fn new(
        stream_name: impl Into<String>,
        feed_type: &'static str,
        gen_interval: Duration,
        feed_dir: impl Into<PathBuf>,
        strategy: GenerationStrategy,
        source: Arc<dyn BatchSource>,
        pool: PgPool,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            feed_type,
            gen_interval,
            feed_dir: feed_dir.into(),
            strategy,
            source,
            pool,
        }
    }

    #[must_use]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    #[must_use]
    pub fn feed_type(&self) -> &'static str {
        self.feed_type
    }

    #[must_use]
    pub fn gen_interval(&self) -> Duration {
        self.gen_interval
    }

    /// Returns the feed's URL secret, creating and persisting one on first
    /// call. Repeated calls return the same value and write at most once.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Db`] if the settings store fails.
    pub async fn secret(&self) -> Result<String, FeedError> {
        let key = settings::keys::feed_url_secret(&self.stream_name);
        if let Some(existing) = settings::get(&self.pool, &key).await? {
            return Ok(existing);
        }
        let fresh = generate_secret();
        let stored = settings::init_if_absent(&self.pool, &key, &fresh).await?;
        Ok(stored)
    }

    /// Replaces the stored secret with a fresh one and returns it.
    ///
    /// Outstanding pull URLs and the published filename become invalid by
    /// construction; the next regeneration publishes under the new name.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Db`] if the settings store fails.
    pub async fn rotate_secret(&self) -> Result<String, FeedError> {
        let key = settings::keys::feed_url_secret(&self.stream_name);
        let fresh = generate_secret();
        settings::put(&self.pool, &key, &fresh).await?;
        tracing::info!(stream = %self.stream_name, "feed secret rotated");
        Ok(fresh)
    }

    /// Public pull URL for this feed, with the secret embedded.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Db`] if the secret cannot be loaded.
    pub async fn data_url(&self, public_base: &str) -> Result<String, FeedError> {
        let secret = self.secret().await?;
        Ok(format!(
            "{public_base}/feeds/{}/data?secret={secret}",
            self.stream_name
        ))
    }

    /// Path the current artifact is published at.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Db`] if the secret cannot be loaded.
    pub async fn file_path(&self) -> Result<PathBuf, FeedError> {
        Ok(self.writer(&self.secret().await?).final_path())
    }

    /// Runs one generation cycle through the configured strategy.
    ///
    /// # Errors
    ///
    /// Propagates source and writer failures; the previously published
    /// artifact survives any failure.
    pub async fn regenerate(&self) -> Result<GenerationReport, FeedError> {
        let started = Instant::now();
        let writer = self.writer(&self.secret().await?);

        let (rows, path) = run_generation(self.strategy, self.source.as_ref(), &writer).await?;
        let elapsed = started.elapsed();
        tracing::info!(
            stream = %self.stream_name,
            rows,
            elapsed_ms = elapsed.as_millis(),
            "feed regenerated"
        );
        Ok(GenerationReport {
            rows,
            path,
            elapsed,
        })
    }

    /// Tells Meta a fresh artifact is ready to pull. Best-effort: failures
    /// are logged and swallowed because Meta's own pull schedule is the
    /// backstop delivery mechanism.
    pub async fn send_upload_notification(&self, client: &UploadClient, public_base: &str) {
        let feed_id_key = settings::keys::meta_feed_id(&self.stream_name);
        let feed_id = match settings::get(&self.pool, &feed_id_key).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::warn!(
                    stream = %self.stream_name,
                    "no Meta feed ID configured; skipping upload notification"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(stream = %self.stream_name, error = %e, "upload notification skipped");
                return;
            }
        };

        let url = match self.data_url(public_base).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(stream = %self.stream_name, error = %e, "upload notification skipped");
                return;
            }
        };

        if let Err(e) = client.notify_upload_ready(&feed_id, &url).await {
            tracing::warn!(stream = %self.stream_name, error = %e, "upload notification failed");
        }
    }

    /// Serves the feed artifact for an authenticated pull.
    ///
    /// Order matters and mirrors the pull contract: a missing artifact is
    /// regenerated first (self-healing), then the presented secret is
    /// compared in constant time, then the bytes are read.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidSecret`] (401) on a bad secret,
    /// [`FeedError::FileMissing`] (404) if the artifact is absent even after
    /// regeneration, or an I/O error (500) if it cannot be read.
    pub async fn serve(&self, presented_secret: &str) -> Result<ServedFeed, FeedError> {
        let secret = self.secret().await?;
        let writer = self.writer(&secret);
        let path = writer.final_path();

        if !path.exists() {
            tracing::info!(stream = %self.stream_name, "artifact missing on pull; regenerating");
            self.regenerate().await?;
        }

        let valid: bool = presented_secret
            .as_bytes()
            .ct_eq(secret.as_bytes())
            .into();
        if !valid {
            return Err(FeedError::InvalidSecret);
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FeedError::FileMissing { path: path.clone() }
            } else {
                FeedError::io(&path, e)
            }
        })?;

        Ok(ServedFeed {
            file_name: writer.file_name(),
            bytes,
        })
    }

    fn writer(&self, secret: &str) -> CsvFeedWriter {
        CsvFeedWriter::new(
            &self.feed_dir,
            &self.stream_name,
            secret,
            self.source.header().to_vec(),
        )
    }
}

/// A fresh URL secret: sha256 of 32 random bytes, hex-encoded.
fn generate_secret() -> String {
    let mut seed = [0u8; 32];
    rand::rng().fill_bytes(&mut seed);
    format!("{:x}", Sha256::digest(seed))
}
