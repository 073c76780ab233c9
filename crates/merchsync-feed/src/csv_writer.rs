//! CSV implementation of the feed file writer.
//!
//! Artifacts are named `{feed}_feed_{secret}.csv` so a secret rotation
//! implicitly invalidates any stale download URL. The temp file is named
//! from a hash of the secret, not the moment in time: concurrent writers
//! for the same feed share a temp path, and the last rename wins with each
//! writer's output self-contained until its rename.
//!
//! Output is deliberately not RFC4180: fields are comma-joined with quoting
//! disabled, matching what the receiving system parses.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::writer::{FeedFileWriter, FeedRow, FeedWriteSession};
use crate::FeedError;

const PROTECTED_INDEX: &str = "index.html";
const PROTECTED_HTACCESS: &str = ".htaccess";
const HTACCESS_CONTENT: &str = "deny from all\n";

/// Writes one feed's CSV artifact under the feed directory.
#[derive(Debug, Clone)]
pub struct CsvFeedWriter {
    feed_dir: PathBuf,
    feed_name: String,
    secret: String,
    header: Vec<&'static str>,
}

impl CsvFeedWriter {
    #[must_use]
    pub fn new(
        feed_dir: impl Into<PathBuf>,
        feed_name: impl Into<String>,
        secret: impl Into<String>,
        header: Vec<&'static str>,
    ) -> Self {
        Self {
            feed_dir: feed_dir.into(),
            feed_name: feed_name.into(),
            secret: secret.into(),
            header,
        }
    }

    /// Published artifact filename, with the secret embedded.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}_feed_{}.csv", self.feed_name, self.secret)
    }

    fn temp_file_name(&self) -> String {
        let digest = Sha256::digest(self.secret.as_bytes());
        format!("{}_feed_temp_{:x}.csv", self.feed_name, digest)
    }

    fn temp_path(&self) -> PathBuf {
        self.feed_dir.join(self.temp_file_name())
    }

    /// Creates the feed directory and its protective files.
    ///
    /// `index.html` and `.htaccess` are materialized once and never
    /// overwritten afterwards.
    fn ensure_directory(&self) -> Result<(), FeedError> {
        fs::create_dir_all(&self.feed_dir).map_err(|e| FeedError::io(&self.feed_dir, e))?;
        write_if_absent(&self.feed_dir.join(PROTECTED_INDEX), "")?;
        write_if_absent(&self.feed_dir.join(PROTECTED_HTACCESS), HTACCESS_CONTENT)?;
        Ok(())
    }
}

fn write_if_absent(path: &Path, content: &str) -> Result<(), FeedError> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, content).map_err(|e| FeedError::io(path, e))
}

impl FeedFileWriter for CsvFeedWriter {
    type Session = CsvWriteSession;

    fn begin(&self) -> Result<CsvWriteSession, FeedError> {
        self.ensure_directory()?;

        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(|e| FeedError::io(&temp_path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(file);
        writer.write_record(&self.header)?;

        Ok(CsvWriteSession {
            writer: Some(writer),
            header: self.header.clone(),
            temp_path,
            final_path: self.final_path(),
            committed: false,
        })
    }

    fn final_path(&self) -> PathBuf {
        self.feed_dir.join(self.file_name())
    }
}

/// In-progress CSV write. See [`FeedWriteSession`] for the commit contract.
pub struct CsvWriteSession {
    writer: Option<csv::Writer<File>>,
    header: Vec<&'static str>,
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl FeedWriteSession for CsvWriteSession {
    fn append_rows(&mut self, rows: &[FeedRow]) -> Result<(), FeedError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        for row in rows {
            let mut record = Vec::with_capacity(self.header.len());
            for column in &self.header {
                let value = row.get(*column).ok_or_else(|| FeedError::MissingColumn {
                    column: (*column).to_string(),
                })?;
                record.push(value.as_str());
            }
            writer.write_record(&record)?;
        }
        Ok(())
    }

    fn commit(mut self) -> Result<PathBuf, FeedError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| FeedError::io(&self.temp_path, e))?;
            // Dropping the writer closes the temp file before the rename.
            drop(writer);
            fs::rename(&self.temp_path, &self.final_path)
                .map_err(|e| FeedError::io(&self.final_path, e))?;
        }
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for CsvWriteSession {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.writer.take());
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
