//! Rate-limited extractor wrapper.
//!
//! Wraps any extractor or mapper so that calls to the external service are
//! held to a request rate. Clones share one limiter, so the extraction and
//! mapping roles of a single service draw from the same budget.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::{
    extractor::PartnerExtractor,
    mapper::{DirectoryMapper, MapRequest},
};
use crate::types::candidate::PartnerCandidate;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// An extractor (and/or mapper) that waits for a permit before every call.
#[derive(Clone)]
pub struct RateLimitedExtractor<T> {
    inner: T,
    limiter: Arc<DefaultRateLimiter>,
}

impl<T> RateLimitedExtractor<T> {
    /// Limit `inner` to `requests_per_second`. Zero is treated as one.
    pub fn new(inner: T, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(inner, Quota::per_second(rps))
    }

    /// Limit with a custom quota.
    pub fn with_quota(inner: T, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Sustained rate with a burst allowance.
    pub fn with_burst(inner: T, requests_per_second: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(burst).unwrap_or(rps);
        Self::with_quota(inner, Quota::per_second(rps).allow_burst(burst))
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<T: PartnerExtractor> PartnerExtractor for RateLimitedExtractor<T> {
    async fn extract(&self, url: &str) -> Result<Vec<PartnerCandidate>> {
        self.wait_for_permit().await;
        self.inner.extract(url).await
    }

    fn ensure_configured(&self) -> Result<()> {
        self.inner.ensure_configured()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<T: DirectoryMapper> DirectoryMapper for RateLimitedExtractor<T> {
    async fn map(&self, request: &MapRequest) -> Result<Vec<String>> {
        self.wait_for_permit().await;
        self.inner.map(request).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension trait for easy rate limiting.
pub trait RateLimitExt: Sized {
    /// Wrap with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedExtractor<Self> {
        RateLimitedExtractor::new(self, requests_per_second)
    }
}

impl<T: PartnerExtractor> RateLimitExt for T {}
