use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::error::DiscoveryError;
use crate::extractors::{FirecrawlDirectory, RateLimitedExtractor};
use crate::pipeline::DEFAULT_REQUEST_TIMEOUT;
use crate::security::credentials::{FirecrawlCredentials, SecretString};

/// Default request rate against the extraction service.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// Runtime settings loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absent keys surface as `ConfigurationMissing` on first use
    pub firecrawl: Option<FirecrawlCredentials>,
    pub request_timeout: Duration,
    pub requests_per_second: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            firecrawl: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let firecrawl = var("FIRECRAWL_API_KEY").map(|key| {
            let creds = FirecrawlCredentials::new(key);
            match var("FIRECRAWL_API_URL") {
                Some(url) => creds.with_base_url(url),
                None => creds,
            }
        });

        let request_timeout = match var("DISCOVERY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .context("DISCOVERY_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
                if secs == 0 {
                    bail!("DISCOVERY_REQUEST_TIMEOUT_SECS must be at least 1 second");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let requests_per_second = match var("DISCOVERY_REQUESTS_PER_SECOND") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("DISCOVERY_REQUESTS_PER_SECOND must be a positive number")?,
            None => DEFAULT_REQUESTS_PER_SECOND,
        };

        Ok(Self {
            firecrawl,
            request_timeout,
            requests_per_second,
        })
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.firecrawl.as_ref().map(|c| &c.api_key)
    }

    /// Rate-limited Firecrawl service for both extraction and mapping.
    pub fn firecrawl_directory(
        &self,
    ) -> std::result::Result<RateLimitedExtractor<FirecrawlDirectory>, DiscoveryError> {
        let directory = FirecrawlDirectory::from_credentials(
            self.api_key(),
            self.firecrawl.as_ref().and_then(|c| c.base_url.as_deref()),
            self.request_timeout,
        )?;
        Ok(RateLimitedExtractor::new(directory, self.requests_per_second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert!(settings.firecrawl.is_none());
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.requests_per_second, 5);
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = Settings::from_lookup(lookup(&[
            ("FIRECRAWL_API_KEY", "fc-123"),
            ("FIRECRAWL_API_URL", "http://localhost:3002/v1"),
            ("DISCOVERY_REQUEST_TIMEOUT_SECS", "12"),
            ("DISCOVERY_REQUESTS_PER_SECOND", "2"),
        ]))
        .unwrap();

        assert_eq!(settings.api_key().unwrap().expose(), "fc-123");
        assert_eq!(
            settings.firecrawl.as_ref().unwrap().base_url.as_deref(),
            Some("http://localhost:3002/v1")
        );
        assert_eq!(settings.request_timeout, Duration::from_secs(12));
        assert_eq!(settings.requests_per_second, 2);
        assert!(!format!("{:?}", settings).contains("fc-123"));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let settings = Settings::from_lookup(lookup(&[("FIRECRAWL_API_KEY", " ")])).unwrap();
        assert!(settings.firecrawl.is_none());
    }

    #[test]
    fn test_bad_numbers_are_errors() {
        assert!(Settings::from_lookup(lookup(&[("DISCOVERY_REQUEST_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("DISCOVERY_REQUESTS_PER_SECOND", "-1")])).is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = Settings::from_lookup(lookup(&[("DISCOVERY_REQUEST_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("at least 1 second"));
    }

    #[test]
    fn test_unconfigured_directory_fails_fast() {
        use crate::traits::extractor::PartnerExtractor;

        let directory = Settings::default().firecrawl_directory().unwrap();
        assert!(matches!(
            directory.ensure_configured(),
            Err(DiscoveryError::ConfigurationMissing { .. })
        ));
    }
}
