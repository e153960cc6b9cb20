//! Error types for the core pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while pulling library pages from the remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (network, TLS, timeout).
    #[error("request for library page {page} failed: {message}")]
    Request { page: u32, message: String },

    /// The source answered with a non-success status.
    #[error("library page {page} returned status {status}: {body}")]
    Status { page: u32, status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("could not decode library page {page}: {message}")]
    Decode { page: u32, message: String },

    /// Pages could not be mirrored into the raw cache.
    #[error("raw cache write failed: {0}")]
    Cache(#[from] CacheError),
}

/// Failure reading or writing one of the local cache files.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON on line {line} of {path}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache file {path} has an unexpected header: {header:?}")]
    Header { path: PathBuf, header: String },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure talking to the spreadsheet destination.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination request failed: {0}")]
    Request(String),

    #[error("destination returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode destination response: {0}")]
    Decode(String),
}

/// Failure of a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Destination(#[from] DestinationError),

    /// Without an ASIN column existing rows cannot be matched, so every
    /// book would be appended again.
    #[error("destination header has no ASIN column: {schema:?}")]
    MissingKeyColumn { schema: Vec<String> },
}
