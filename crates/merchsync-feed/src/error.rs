use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row is missing header column \"{column}\"")]
    MissingColumn { column: String },

    #[error("invalid feed secret")]
    InvalidSecret,

    #[error("feed file not found: {path}")]
    FileMissing { path: PathBuf },

    #[error("unknown feed stream: {0}")]
    UnknownStream(String),

    #[error("upload endpoint returned HTTP {status}")]
    UploadRejected { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Db(#[from] merchsync_db::DbError),
}

impl FeedError {
    /// HTTP status the feed pull endpoint maps this failure to.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            FeedError::InvalidSecret => 401,
            FeedError::FileMissing { .. } | FeedError::UnknownStream(_) => 404,
            _ => 500,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FeedError::Io {
            path: path.into(),
            source,
        }
    }
}
