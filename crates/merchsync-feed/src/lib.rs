//! Feed generation pipeline: batched extraction of store data into CSV
//! artifacts that Meta pulls over capability-token URLs.
//!
//! The pipeline is built from four pieces:
//!
//! - [`FeedFileWriter`] / [`CsvFeedWriter`] — atomic write-temp-then-rename
//!   persistence of one feed artifact.
//! - [`BatchSource`] — paged extraction of source rows, pure in the batch
//!   number so batches can be retried.
//! - [`Feed`] — the per-stream orchestrator: secret lifecycle, regeneration,
//!   upload notification, and the serving contract.
//! - [`FeedRegistry`] — the explicit stream-name → feed mapping the scheduler
//!   and HTTP handlers dispatch through.

mod csv_writer;
mod error;
mod feed;
mod generator;
mod registry;
pub mod sources;
mod upload;
mod writer;

pub use csv_writer::{CsvFeedWriter, CsvWriteSession};
pub use error::FeedError;
pub use feed::{Feed, GenerationReport, ServedFeed};
pub use generator::{run_generation, BatchSource, GenerationStrategy};
pub use registry::{build_registry, FeedRegistry};
pub use upload::UploadClient;
pub use writer::{FeedFileWriter, FeedRow, FeedWriteSession};
