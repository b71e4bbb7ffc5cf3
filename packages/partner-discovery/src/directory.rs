//! Directory page shortlisting.
//!
//! The mapping service returns every URL it can find on a site, usually far
//! more than are worth extracting from. This module keeps the ones that look
//! like partner or integration directories and ranks them.

use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::info;
use url::Url;

use crate::candidates::root_domain;
use crate::error::Result;
use crate::traits::mapper::{DirectoryMapper, MapRequest};
use crate::types::config::DiscoveryConfig;

/// How many ranked URLs make the shortlist.
pub const SHORTLIST_SIZE: usize = 10;

/// File types that are never directory pages.
pub const BLOCKED_EXTENSIONS: &[&str] = &[".pdf", ".png", ".jpg", ".jpeg", ".svg", ".zip"];

const SCORE_KEYWORDS: &[&str] = &["partner", "integration", "marketplace"];

static ALLOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/(?:partners?|partner-[a-z0-9-]+|[a-z0-9-]+-partners|integrations?|[a-z0-9-]+-integrations|marketplace|app-marketplace|apps|app-directory|directory|ecosystem|connectors|plugins|extensions)(?:/|$)",
    )
    .expect("allow pattern is valid")
});

static DENY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/(?:blog|news|press|press-releases|pricing|docs?|documentation|api-reference|careers|jobs|legal|privacy|terms|cookies?|support|help|login|signin|sign-in|signup|sign-up|events|webinars?|case-studies|customers|investors|about)(?:/|$)",
    )
    .expect("deny pattern is valid")
});

/// Result of mapping and shortlisting a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPages {
    /// Best directory candidates, highest score first
    pub shortlist: Vec<String>,
    /// URLs the mapping service returned
    pub total_urls: usize,
    /// URLs that passed the filters (before the shortlist cut)
    pub filtered_urls: usize,
}

/// Map `base_url` and shortlist the directory-looking pages.
///
/// Mapping failures propagate; the orchestrator treats them as non-fatal.
pub async fn find_directory_pages<M: DirectoryMapper + ?Sized>(
    mapper: &M,
    base_url: &str,
    config: &DiscoveryConfig,
) -> Result<DirectoryPages> {
    let request = MapRequest::from_config(base_url, config);
    let urls = mapper.map(&request).await?;
    let pages = shortlist_urls(base_url, &urls, config);

    info!(
        url = %base_url,
        mapper = mapper.name(),
        total = pages.total_urls,
        filtered = pages.filtered_urls,
        shortlisted = pages.shortlist.len(),
        "Mapped site"
    );

    Ok(pages)
}

/// Filter and rank mapped URLs. Deterministic for a given input order.
pub fn shortlist_urls(base_url: &str, urls: &[String], config: &DiscoveryConfig) -> DirectoryPages {
    let unique: IndexSet<&str> = urls.iter().map(String::as_str).collect();
    let base_host = Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

    let mut scored: Vec<(usize, &str)> = unique
        .into_iter()
        .filter(|url| is_directory_candidate(url))
        .filter(|url| subdomain_allowed(url, base_host.as_deref(), config))
        .map(|url| (score_url(url), url))
        .collect();

    let filtered_urls = scored.len();

    // sort_by is stable: equal scores keep map order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    DirectoryPages {
        shortlist: scored
            .into_iter()
            .take(SHORTLIST_SIZE)
            .map(|(_, url)| url.to_string())
            .collect(),
        total_urls: urls.len(),
        filtered_urls,
    }
}

/// Whether a URL passes the extension, allow and deny filters.
pub fn is_directory_candidate(url: &str) -> bool {
    let path = url_path(url).to_ascii_lowercase();
    if BLOCKED_EXTENSIONS.iter().any(|ext| path.contains(ext)) {
        return false;
    }
    ALLOW_PATTERN.is_match(&path) && !DENY_PATTERN.is_match(&path)
}

/// Heuristic score: +2 for an allow-pattern match, +1 per keyword present.
pub fn score_url(url: &str) -> usize {
    let lower = url.to_ascii_lowercase();
    let allow = if ALLOW_PATTERN.is_match(&url_path(url)) { 2 } else { 0 };
    allow + SCORE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count()
}

fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}

/// Subdomain gate for modes that map across subdomains.
///
/// Same-host URLs always pass. Other subdomains of the seed's root pass only
/// if their first label is listed in `allowed_subdomains`.
fn subdomain_allowed(url: &str, base_host: Option<&str>, config: &DiscoveryConfig) -> bool {
    if !config.include_subdomains || config.allowed_subdomains.is_empty() {
        return true;
    }
    let (Some(base_host), Some(host)) = (
        base_host,
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase)),
    ) else {
        return true;
    };

    let strip_www = |h: &str| h.strip_prefix("www.").unwrap_or(h).to_string();
    if strip_www(&host) == strip_www(base_host) {
        return true;
    }

    match root_domain(base_host) {
        Some(root) if host.ends_with(&format!(".{}", root)) => {
            let label = host.split('.').next().unwrap_or_default();
            config
                .allowed_subdomains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(label))
        }
        _ => false,
    }
}
