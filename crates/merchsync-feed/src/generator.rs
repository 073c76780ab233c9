//! The batched generation contract and the two generation strategies.
//!
//! A [`BatchSource`] must compute batch N purely from the batch number
//! (OFFSET/LIMIT paging), never from prior batch results, because the
//! scheduler may retry an individual batch. Both strategies commit through
//! the same writer session path and must produce byte-identical artifacts
//! for the same source snapshot.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::writer::{FeedFileWriter, FeedRow, FeedWriteSession};
use crate::FeedError;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Paged extraction of feed rows from a data source.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Column order for the artifact; also the per-row accessor list.
    fn header(&self) -> &'static [&'static str];

    /// Rows per batch. A short (or empty) batch terminates generation.
    fn batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }

    /// Returns batch `batch_number` (zero-based). Must be a pure function
    /// of the batch number so retries observe the same page.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the underlying query fails.
    async fn items_for_batch(&self, batch_number: u64) -> Result<Vec<FeedRow>, FeedError>;
}

/// How a feed's artifact gets produced. Selected at feed construction so
/// retiring the single-pass path is a construction-site change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStrategy {
    /// Page through the source, appending each batch to the write session.
    Batched,
    /// Drain the source in one pass and write the whole artifact at once.
    FullScan,
}

/// Runs one generation cycle: extracts every row from `source` and commits
/// the artifact through `writer`. Returns the row count and artifact path.
///
/// # Errors
///
/// Propagates source and writer failures; on error the previously published
/// artifact is untouched.
pub async fn run_generation<W: FeedFileWriter>(
    strategy: GenerationStrategy,
    source: &dyn BatchSource,
    writer: &W,
) -> Result<(usize, PathBuf), FeedError> {
    match strategy {
        GenerationStrategy::Batched => run_batched(source, writer).await,
        GenerationStrategy::FullScan => run_full_scan(source, writer).await,
    }
}

async fn run_batched<W: FeedFileWriter>(
    source: &dyn BatchSource,
    writer: &W,
) -> Result<(usize, PathBuf), FeedError> {
    let batch_size = source.batch_size();
    let mut session = writer.begin()?;
    let mut total = 0usize;
    let mut batch_number = 0u64;

    loop {
        let items = source.items_for_batch(batch_number).await?;
        let exhausted = items.len() < batch_size;
        total += items.len();
        session.append_rows(&items)?;
        if exhausted {
            break;
        }
        batch_number += 1;
    }

    let path = session.commit()?;
    Ok((total, path))
}

async fn run_full_scan<W: FeedFileWriter>(
    source: &dyn BatchSource,
    writer: &W,
) -> Result<(usize, PathBuf), FeedError> {
    let batch_size = source.batch_size();
    let mut rows = Vec::new();
    let mut batch_number = 0u64;

    loop {
        let items = source.items_for_batch(batch_number).await?;
        let exhausted = items.len() < batch_size;
        rows.extend(items);
        if exhausted {
            break;
        }
        batch_number += 1;
    }

    let path = writer.write_feed_file(&rows)?;
    Ok((rows.len(), path))
}
