//! Error types for the search library.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during credential discovery and search.
///
/// These never escape [`HowLongToBeat::search`](crate::HowLongToBeat::search);
/// they are logged and turned into an empty result list there.
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP request failed (connection, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// No script or init endpoint yielded a usable credential.
    #[error("No search credential could be discovered")]
    NoCredential,

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
