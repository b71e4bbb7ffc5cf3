//! Firecrawl-backed extraction and mapping.
//!
//! One [`FirecrawlDirectory`] serves both roles: structured extraction of
//! partner listings from a page, and site mapping for the shortlist stage.

use async_trait::async_trait;
use schemars::{gen::SchemaSettings, JsonSchema};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use firecrawl_client::{ExtractRequest, FirecrawlClient};

use crate::error::{DiscoveryError, Result};
use crate::security::SecretString;
use crate::traits::{
    extractor::PartnerExtractor,
    mapper::{DirectoryMapper, MapRequest},
};
use crate::types::candidate::PartnerCandidate;

/// Environment variable holding the Firecrawl credential.
pub const API_KEY_VAR: &str = "FIRECRAWL_API_KEY";

/// Instruction sent with every extraction call.
pub const PARTNER_PROMPT: &str = "Extract every official partner, integration, or app listed in \
this page's partner or integration directory. For each entry return its name, its category if \
shown, the URL of its listing or website, and a one-sentence description. Only include entries \
that belong to the directory itself. Ignore customer logos, investors, testimonials, press \
mentions, and navigation links.";

/// One directory listing as the service returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPartner {
    /// Partner or integration name as listed
    #[schemars(required)]
    pub name: Option<String>,
    /// Directory category (e.g. "CRM", "Payments")
    #[serde(default)]
    pub category: Option<String>,
    /// Listing page or partner website
    #[serde(default)]
    pub partner_url: Option<String>,
    /// Short description from the listing
    #[serde(default)]
    pub description: Option<String>,
}

/// Schema root for the extraction call.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PartnerListings {
    #[serde(default)]
    pub partners: Vec<ExtractedPartner>,
}

/// Extraction response body.
///
/// The listings arrive either at the top level or nested under `data`
/// depending on API version. Use [`ExtractResponse::into_partners`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    partners: Option<Vec<ExtractedPartner>>,
    #[serde(default)]
    data: Option<PartnerListings>,
}

impl ExtractResponse {
    pub fn into_partners(self) -> Vec<ExtractedPartner> {
        match (self.partners, self.data) {
            (Some(top), _) if !top.is_empty() => top,
            (_, Some(data)) => data.partners,
            (top, None) => top.unwrap_or_default(),
        }
    }
}

static PARTNER_SCHEMA: LazyLock<serde_json::Value> = LazyLock::new(partner_schema);

/// JSON schema for [`PartnerListings`], fully inlined and without `$schema`.
pub fn partner_schema() -> serde_json::Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<PartnerListings>();
    serde_json::to_value(schema).unwrap_or_default()
}

/// Turn raw listings into candidates for `source_url`.
///
/// Unnamed listings get a positional name so they survive as long as they
/// carry a URL or description.
pub fn to_candidates(source_url: &str, raw: Vec<ExtractedPartner>) -> Vec<PartnerCandidate> {
    raw.into_iter()
        .enumerate()
        .map(|(i, item)| {
            let name = item
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("Partner {}", i + 1));

            PartnerCandidate {
                partner_name: name,
                website: item.partner_url,
                category: item.category,
                partner_type: None,
                notes: item.description,
                inferred_reach: None,
                source_url: Some(source_url.to_string()),
            }
        })
        .collect()
}

/// Firecrawl implementation of [`PartnerExtractor`] and [`DirectoryMapper`].
///
/// Built without a credential it still constructs, but
/// [`PartnerExtractor::ensure_configured`] fails and no call is ever made.
#[derive(Debug, Clone)]
pub struct FirecrawlDirectory {
    client: Option<FirecrawlClient>,
}

impl FirecrawlDirectory {
    /// Wrap an existing client.
    pub fn new(client: FirecrawlClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// A directory with no credential.
    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    /// Build from an optional key, base URL and request timeout.
    pub fn from_credentials(
        api_key: Option<&SecretString>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let Some(key) = api_key.filter(|k| !k.is_blank()) else {
            return Ok(Self::unconfigured());
        };

        let mut client = FirecrawlClient::with_timeout(key.expose(), timeout)
            .map_err(|e| DiscoveryError::Transport(Box::new(e)))?;
        if let Some(url) = base_url {
            client = client.with_base_url(url);
        }
        Ok(Self::new(client))
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&FirecrawlClient> {
        self.client
            .as_ref()
            .ok_or(DiscoveryError::ConfigurationMissing { name: API_KEY_VAR })
    }
}

#[async_trait]
impl PartnerExtractor for FirecrawlDirectory {
    async fn extract(&self, url: &str) -> Result<Vec<PartnerCandidate>> {
        let client = self.client()?;
        let request = ExtractRequest::new(url, PARTNER_PROMPT, PARTNER_SCHEMA.clone());

        let response: ExtractResponse = client
            .extract(&request)
            .await
            .map_err(|e| DiscoveryError::from_extract(url, e))?;

        let candidates = to_candidates(url, response.into_partners());
        debug!(url = %url, count = candidates.len(), "Firecrawl extraction");
        Ok(candidates)
    }

    fn ensure_configured(&self) -> Result<()> {
        self.client().map(|_| ())
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}

#[async_trait]
impl DirectoryMapper for FirecrawlDirectory {
    async fn map(&self, request: &MapRequest) -> Result<Vec<String>> {
        let client = self.client()?;
        let body = firecrawl_client::MapRequest {
            url: request.url.clone(),
            include_subdomains: request.include_subdomains,
            limit: request.limit,
            max_depth: request.max_depth,
        };

        let response = client
            .map(&body)
            .await
            .map_err(|e| DiscoveryError::from_map(&request.url, e))?;
        Ok(response.into_urls())
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
