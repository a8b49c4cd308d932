// Error types for the corona-tracker data core.
// Covers transport, table parsing, selection, and dataset pairing failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    BadStatus { status: u16, url: String },

    #[error("malformed table: {0}")]
    MalformedTable(String),

    #[error("unknown dataset key: {0}")]
    UnknownDataset(String),

    #[error("selection index {index} out of bounds for catalog of {len} locations")]
    InvalidSelector { index: usize, len: usize },

    #[error("catalog generation {catalog} does not match table generation {table}")]
    StaleCatalog { catalog: u64, table: u64 },

    #[error("paired tables diverge: {0}")]
    SchemaMismatch(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
