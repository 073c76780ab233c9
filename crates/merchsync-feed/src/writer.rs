//! The feed file writer contract.
//!
//! A writer produces exactly one artifact per commit, and the rename is the
//! commit: readers only ever observe the previous complete artifact or the
//! new complete artifact, never an intermediate state.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::FeedError;

/// One feed record, keyed by header column name.
pub type FeedRow = HashMap<String, String>;

/// An in-progress write. Rows are appended to a temp file; [`commit`]
/// atomically renames it over the published path.
///
/// Dropping an uncommitted session removes the temp file and leaves the
/// published artifact untouched.
///
/// [`commit`]: FeedWriteSession::commit
pub trait FeedWriteSession {
    /// Appends records in header-column order. A row missing a
    /// header-declared column is a hard error and aborts the write.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MissingColumn`] or an I/O-level failure.
    fn append_rows(&mut self, rows: &[FeedRow]) -> Result<(), FeedError>;

    /// Flushes and atomically publishes the artifact, returning its path.
    ///
    /// # Errors
    ///
    /// Returns an I/O-level failure; the temp file is removed and the
    /// previously published artifact survives unchanged.
    fn commit(self) -> Result<PathBuf, FeedError>;
}

/// Durable, atomic persistence of one tabular feed.
pub trait FeedFileWriter {
    type Session: FeedWriteSession;

    /// Opens a fresh write session: directory ensured, protective files in
    /// place, temp file created with the header row written.
    ///
    /// # Errors
    ///
    /// Returns an I/O-level failure.
    fn begin(&self) -> Result<Self::Session, FeedError>;

    /// Path the committed artifact is published at.
    fn final_path(&self) -> PathBuf;

    /// Writes a complete feed in one call (the legacy single-pass path).
    ///
    /// # Errors
    ///
    /// Propagates any session failure; on error the previously published
    /// artifact is untouched.
    fn write_feed_file(&self, rows: &[FeedRow]) -> Result<PathBuf, FeedError> {
        let mut session = self.begin()?;
        session.append_rows(rows)?;
        session.commit()
    }
}
