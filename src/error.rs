//! Error types for the brochure crate

use thiserror::Error;

use crate::fetch::FetchError;

/// Result type for brochure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for brochure operations
///
/// Only configuration-class failures and stage-level "nothing to work with"
/// conditions surface here. Per-link and per-reply problems are absorbed by
/// the stage that hits them.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response that retrying cannot fix
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model backend gave up after exhausting its retries
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Page retrieval error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The selector returned no usable links
    #[error("No relevant links found for {0}")]
    NoRelevantLinks(String),

    /// Compilation produced no usable content
    #[error("No content could be compiled: {0}")]
    EmptyContent(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
