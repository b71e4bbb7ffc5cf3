//! Error types for the Firecrawl client.

use thiserror::Error;

/// Result type for Firecrawl client operations.
pub type Result<T> = std::result::Result<T, FirecrawlError>;

/// Firecrawl client errors.
#[derive(Debug, Error)]
pub enum FirecrawlError {
    /// Non-2xx response from the API
    #[error("Firecrawl API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Network error (connection failed, request timeout)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FirecrawlError {
    /// HTTP status for API errors, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FirecrawlError::Api { status, .. } => Some(*status),
            FirecrawlError::Http(e) => e.status().map(|s| s.as_u16()),
            FirecrawlError::Decode { .. } => None,
        }
    }

    /// Whether the underlying request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FirecrawlError::Http(e) if e.is_timeout())
    }
}
