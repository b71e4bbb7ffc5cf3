//! Site mapping: list the URLs a site exposes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::config::DiscoveryConfig;

/// Parameters for one mapping call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRequest {
    pub url: String,
    pub include_subdomains: bool,
    pub limit: u32,
    pub max_depth: u32,
}

impl MapRequest {
    /// Mapping request for `url` using a mode's limits.
    pub fn from_config(url: impl Into<String>, config: &DiscoveryConfig) -> Self {
        Self {
            url: url.into(),
            include_subdomains: config.include_subdomains,
            limit: config.max_pages,
            max_depth: config.max_depth,
        }
    }
}

/// Lists the URLs of a site, in the service's own order.
///
/// Implementations fail with [`DiscoveryError::MappingFailed`] on a
/// non-success response.
///
/// [`DiscoveryError::MappingFailed`]: crate::error::DiscoveryError::MappingFailed
#[async_trait]
pub trait DirectoryMapper: Send + Sync {
    async fn map(&self, request: &MapRequest) -> Result<Vec<String>>;

    /// Get the mapper name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
