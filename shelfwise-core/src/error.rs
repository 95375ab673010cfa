//! Error types for shelfwise-core

use thiserror::Error;

/// Main error type for the shelfwise-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A query against the document store failed (network, auth, gateway)
    #[error("fetch from {collection} failed: {message}")]
    FetchFailed { collection: String, message: String },

    /// Records were dropped during aggregation and the caller asked for strict input
    #[error("{count} record(s) skipped during aggregation")]
    ParseSkipped { count: usize },

    /// Trend inputs that cannot produce a meaningful comparison
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Fine configuration value outside its allowed range
    #[error("invalid fine configuration: {0}")]
    InvalidFineConfig(String),

    /// Notification payload rejected before dispatch
    #[error("invalid notification: {0}")]
    InvalidNotification(String),

    /// Notification dispatch error
    #[error("dispatch error: {0}")]
    Dispatch(String),
}

impl Error {
    /// Shorthand for a store failure on a named collection.
    pub fn fetch(collection: &str, message: impl Into<String>) -> Self {
        Error::FetchFailed {
            collection: collection.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for shelfwise-core
pub type Result<T> = std::result::Result<T, Error>;
