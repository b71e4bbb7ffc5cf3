//! Testing utilities including mock implementations.
//!
//! These let applications (and this crate's own tests) drive a full
//! discovery run without touching the network or the wall clock.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{DiscoveryError, Result};
use crate::traits::{
    clock::Clock,
    extractor::PartnerExtractor,
    mapper::{DirectoryMapper, MapRequest},
};
use crate::types::candidate::PartnerCandidate;

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    /// Start at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += chrono::Duration::from_std(by).unwrap();
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canned behaviour for one URL.
#[derive(Debug, Clone)]
enum Canned {
    Partners(Vec<PartnerCandidate>),
    Failure { status: u16, body: String },
}

/// Mock extractor with per-URL canned responses.
///
/// URLs with nothing configured return no partners (or the default failure,
/// if one is set). Clones share state, so keep a clone to inspect calls
/// after handing the mock to a [`Discovery`](crate::Discovery).
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<RwLock<HashMap<String, Canned>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    default_failure: Arc<RwLock<Option<(u16, String)>>>,
    calls: Arc<RwLock<Vec<String>>>,
    configured: bool,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            responses: Arc::default(),
            delays: Arc::default(),
            default_failure: Arc::default(),
            calls: Arc::default(),
            configured: true,
        }
    }

    /// An extractor whose credential is missing.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Return these partners for `url`. `source_url` is stamped as a real
    /// extractor would.
    pub fn with_partners(self, url: impl Into<String>, partners: Vec<PartnerCandidate>) -> Self {
        let url = url.into();
        let stamped = partners
            .into_iter()
            .map(|p| p.with_source_url(url.clone()))
            .collect();
        self.responses
            .write()
            .unwrap()
            .insert(url, Canned::Partners(stamped));
        self
    }

    /// Fail `url` with a service error.
    pub fn with_failure(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.responses.write().unwrap().insert(
            url.into(),
            Canned::Failure {
                status,
                body: body.into(),
            },
        );
        self
    }

    /// Fail every URL without a canned response.
    pub fn failing_by_default(self, status: u16, body: impl Into<String>) -> Self {
        *self.default_failure.write().unwrap() = Some((status, body.into()));
        self
    }

    /// Sleep before answering for `url`.
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(url.into(), delay);
        self
    }

    /// URLs extracted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl PartnerExtractor for MockExtractor {
    async fn extract(&self, url: &str) -> Result<Vec<PartnerCandidate>> {
        self.calls.write().unwrap().push(url.to_string());

        let delay = self.delays.read().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let canned = self.responses.read().unwrap().get(url).cloned();
        match canned {
            Some(Canned::Partners(partners)) => Ok(partners),
            Some(Canned::Failure { status, body }) => Err(DiscoveryError::ExtractionFailed {
                url: url.to_string(),
                status,
                body,
            }),
            None => match self.default_failure.read().unwrap().clone() {
                Some((status, body)) => Err(DiscoveryError::ExtractionFailed {
                    url: url.to_string(),
                    status,
                    body,
                }),
                None => Ok(Vec::new()),
            },
        }
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.configured {
            Ok(())
        } else {
            Err(DiscoveryError::ConfigurationMissing {
                name: "FIRECRAWL_API_KEY",
            })
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock mapper returning a fixed URL list or a fixed failure.
#[derive(Clone, Default)]
pub struct MockMapper {
    urls: Arc<RwLock<Vec<String>>>,
    failure: Arc<RwLock<Option<(u16, String)>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    calls: Arc<RwLock<Vec<MapRequest>>>,
}

impl MockMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_urls(self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        *self.urls.write().unwrap() = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_failure(self, status: u16, body: impl Into<String>) -> Self {
        *self.failure.write().unwrap() = Some((status, body.into()));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MapRequest> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl DirectoryMapper for MockMapper {
    async fn map(&self, request: &MapRequest) -> Result<Vec<String>> {
        self.calls.write().unwrap().push(request.clone());

        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((status, body)) = self.failure.read().unwrap().clone() {
            return Err(DiscoveryError::MappingFailed { status, body });
        }
        Ok(self.urls.read().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// `count` usable partners named `{prefix} 1..=count`, each on its own host.
pub fn sample_partners(prefix: &str, count: usize) -> Vec<PartnerCandidate> {
    (1..=count)
        .map(|i| {
            let slug = prefix.to_lowercase().replace(' ', "-");
            PartnerCandidate::new(format!("{} {}", prefix, i))
                .with_website(format!("https://{}-{}.example", slug, i))
                .with_category("Integration")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_extractor_canned_and_default() {
        let mock = MockExtractor::new()
            .with_partners("https://a.com/partners", sample_partners("A", 2))
            .with_failure("https://a.com/apps", 500, "boom");

        let found = mock.extract("https://a.com/partners").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].source_url.as_deref(), Some("https://a.com/partners"));

        assert!(matches!(
            mock.extract("https://a.com/apps").await,
            Err(DiscoveryError::ExtractionFailed { status: 500, .. })
        ));
        assert!(mock.extract("https://a.com/other").await.unwrap().is_empty());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_extractor_default_failure() {
        let mock = MockExtractor::new().failing_by_default(503, "down");
        assert!(mock.extract("https://a.com").await.is_err());
    }

    #[test]
    fn test_unconfigured_extractor() {
        assert!(MockExtractor::new().ensure_configured().is_ok());
        assert!(matches!(
            MockExtractor::unconfigured().ensure_configured(),
            Err(DiscoveryError::ConfigurationMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_mapper_records_requests() {
        let mock = MockMapper::new().with_urls(["https://a.com/partners"]);
        let request = MapRequest {
            url: "https://a.com".into(),
            include_subdomains: false,
            limit: 50,
            max_depth: 2,
        };
        assert_eq!(mock.map(&request).await.unwrap().len(), 1);
        assert_eq!(mock.calls(), vec![request]);
    }

    #[test]
    fn test_fake_clock_advances() {
        let clock = FakeClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!((clock.now() - start).num_seconds(), 90);
    }

    #[test]
    fn test_sample_partners_are_usable_and_distinct() {
        let partners = sample_partners("Acme App", 3);
        assert_eq!(partners.len(), 3);
        assert!(partners.iter().all(|p| p.is_usable()));
        assert_eq!(
            partners[2].website.as_deref(),
            Some("https://acme-app-3.example")
        );
    }
}
