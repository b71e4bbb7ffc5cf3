//! Partner extraction from a single page.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::candidate::PartnerCandidate;

/// Extracts partner listings from one URL.
///
/// Implementations fail with [`DiscoveryError::ExtractionFailed`] on a
/// non-success response from the service. Whether that aborts anything is
/// the caller's decision; the orchestrator's loops skip the URL and move on.
///
/// [`DiscoveryError::ExtractionFailed`]: crate::error::DiscoveryError::ExtractionFailed
#[async_trait]
pub trait PartnerExtractor: Send + Sync {
    /// Extract candidates from a page. Every returned candidate has
    /// `source_url` set to `url`.
    async fn extract(&self, url: &str) -> Result<Vec<PartnerCandidate>>;

    /// Fail fast if a required credential is missing.
    ///
    /// Called once per run before any network traffic.
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// Get the extractor name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
