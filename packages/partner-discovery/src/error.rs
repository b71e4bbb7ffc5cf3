//! Typed errors for the discovery pipeline.
//!
//! Only [`DiscoveryError::ConfigurationMissing`] and
//! [`DiscoveryError::Cancelled`] ever escape a discovery run. Every other
//! variant is absorbed by the stage that produced it and shows up in the
//! trace instead.

use thiserror::Error;

use firecrawl_client::FirecrawlError;

/// Errors that can occur during partner discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Extraction service returned a non-success status
    #[error("extraction failed for {url} (status {status}): {body}")]
    ExtractionFailed {
        url: String,
        status: u16,
        body: String,
    },

    /// Mapping service returned a non-success status
    #[error("mapping failed (status {status}): {body}")]
    MappingFailed { status: u16, body: String },

    /// A required credential is absent
    #[error("missing configuration: {name}")]
    ConfigurationMissing { name: &'static str },

    /// Input could not be parsed as an absolute URL
    #[error("could not parse URL: {input}")]
    ParseFailure { input: String },

    /// External call exceeded the request timeout
    #[error("{operation} timed out for {url}")]
    Timeout {
        operation: &'static str,
        url: String,
    },

    /// Network or transport failure talking to the external service
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Service responded successfully but the body was unusable
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// Run was cancelled by the caller
    #[error("discovery cancelled")]
    Cancelled,
}

impl DiscoveryError {
    /// Whether this error must abort the whole run rather than a single step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiscoveryError::ConfigurationMissing { .. } | DiscoveryError::Cancelled
        )
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DiscoveryError::ExtractionFailed { status, .. }
            | DiscoveryError::MappingFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Convert a Firecrawl error raised while extracting `url`.
    pub(crate) fn from_extract(url: &str, err: FirecrawlError) -> Self {
        match err {
            FirecrawlError::Api { status, body } => DiscoveryError::ExtractionFailed {
                url: url.to_string(),
                status,
                body,
            },
            e if e.is_timeout() => DiscoveryError::Timeout {
                operation: "extract",
                url: url.to_string(),
            },
            FirecrawlError::Decode { source, .. } => DiscoveryError::MalformedResponse {
                url: url.to_string(),
                reason: source.to_string(),
            },
            FirecrawlError::Http(e) => DiscoveryError::Transport(Box::new(e)),
        }
    }

    /// Convert a Firecrawl error raised while mapping `url`.
    pub(crate) fn from_map(url: &str, err: FirecrawlError) -> Self {
        match err {
            FirecrawlError::Api { status, body } => DiscoveryError::MappingFailed { status, body },
            e if e.is_timeout() => DiscoveryError::Timeout {
                operation: "map",
                url: url.to_string(),
            },
            FirecrawlError::Decode { source, .. } => DiscoveryError::MalformedResponse {
                url: url.to_string(),
                reason: source.to_string(),
            },
            FirecrawlError::Http(e) => DiscoveryError::Transport(Box::new(e)),
        }
    }
}

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DiscoveryError::ConfigurationMissing {
            name: "FIRECRAWL_API_KEY"
        }
        .is_fatal());
        assert!(DiscoveryError::Cancelled.is_fatal());
        assert!(!DiscoveryError::MappingFailed {
            status: 500,
            body: String::new()
        }
        .is_fatal());
        assert!(!DiscoveryError::Timeout {
            operation: "extract",
            url: "https://a.com".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_api_error_maps_to_extraction_failed() {
        let err = DiscoveryError::from_extract(
            "https://a.com/partners",
            FirecrawlError::Api {
                status: 402,
                body: "payment required".into(),
            },
        );
        match err {
            DiscoveryError::ExtractionFailed { url, status, body } => {
                assert_eq!(url, "https://a.com/partners");
                assert_eq!(status, 402);
                assert_eq!(body, "payment required");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_maps_to_mapping_failed() {
        let err = DiscoveryError::from_map(
            "https://a.com",
            FirecrawlError::Api {
                status: 500,
                body: "boom".into(),
            },
        );
        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, DiscoveryError::MappingFailed { .. }));
    }

    #[test]
    fn test_decode_error_maps_to_malformed() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = DiscoveryError::from_extract(
            "https://a.com",
            FirecrawlError::Decode {
                endpoint: "/extract".into(),
                source,
            },
        );
        assert!(matches!(err, DiscoveryError::MalformedResponse { .. }));
    }
}
