//! Error types for the fraud feed

use thiserror::Error;

/// Event-stream transport failures. Never fatal: they drive reconnection.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("event source returned status {0}")]
    Status(u16),

    #[error("event stream closed by server")]
    Closed,
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FeedError::Status(status.as_u16()),
            None => FeedError::Transport(err.to_string()),
        }
    }
}

/// Batch endpoint failures, mapped to "backend offline" by the public API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Simulator input that cannot be scored
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
