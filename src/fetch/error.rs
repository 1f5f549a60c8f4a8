//! Error types for the fetch module

use thiserror::Error;

/// Error type for page retrieval
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// robots.txt forbids this URL
    #[error("Blocked by robots.txt: {0}")]
    Disallowed(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Headless browser failure
    #[error("Render error: {0}")]
    Render(String),

    /// Cache filesystem error
    #[error("Cache error: {0}")]
    Io(#[from] std::io::Error),
}
