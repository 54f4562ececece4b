//! Search error types.

use thiserror::Error;

/// Errors that can occur in catalog search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The backend rejected or failed a call.
    #[error("Backend error: {0}")]
    Backend(String),

    /// HTTP error response from a backend.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The URL store could not be read or written.
    #[error("URL error: {0}")]
    Url(String),

    /// A query value could not be interpreted.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    /// Create a backend error from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        SearchError::Backend(cause.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        SearchError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SearchError {
    fn from(e: toml::de::Error) -> Self {
        SearchError::Config(e.to_string())
    }
}

/// Result alias for search operations.
pub type Result<T, E = SearchError> = std::result::Result<T, E>;
