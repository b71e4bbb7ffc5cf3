//! Pure Firecrawl REST API client.
//!
//! A minimal client for the two Firecrawl endpoints the discovery pipeline
//! needs: structured extraction and site mapping. No domain logic lives here;
//! callers supply the prompt and schema and decide what to do with failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use firecrawl_client::{ExtractRequest, FirecrawlClient, MapRequest};
//!
//! let client = FirecrawlClient::new("fc-...")?;
//!
//! let mapped = client
//!     .map(&MapRequest {
//!         url: "https://example.com".into(),
//!         include_subdomains: false,
//!         limit: 50,
//!         max_depth: 2,
//!     })
//!     .await?;
//! for url in mapped.into_urls() {
//!     println!("{url}");
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::{ExtractRequest, MapRequest, MapResponse};

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct FirecrawlClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirecrawlClient {
    /// Create a client with the default base URL and request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Create a client whose HTTP requests give up after `timeout`.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Set a custom base URL (self-hosted Firecrawl, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run structured extraction against a single page.
    ///
    /// The response body is decoded into `T` as-is; shape tolerance belongs
    /// to the caller's response type.
    pub async fn extract<T: DeserializeOwned>(&self, request: &ExtractRequest) -> Result<T> {
        tracing::debug!(url = %request.url, "Firecrawl extract");
        self.post("/extract", request).await
    }

    /// Map a site to its known URLs.
    pub async fn map(&self, request: &MapRequest) -> Result<MapResponse> {
        tracing::debug!(
            url = %request.url,
            limit = request.limit,
            max_depth = request.max_depth,
            include_subdomains = request.include_subdomains,
            "Firecrawl map"
        );
        self.post("/map", request).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|source| FirecrawlError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
