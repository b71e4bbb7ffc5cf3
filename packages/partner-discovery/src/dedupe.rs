//! Candidate deduplication.
//!
//! Two candidates are the same partner when their trimmed, lowercased names
//! match and they point at the same host (website, else source page).

use std::collections::HashSet;
use url::Url;

use crate::types::candidate::PartnerCandidate;

/// Output of a one-shot [`dedupe`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduped {
    pub unique: Vec<PartnerCandidate>,
    pub dropped_count: usize,
}

/// Identity key for a candidate: `name::host`.
///
/// The host comes from the website, resolved against the source page when
/// the listing linked it relatively, else from the source page itself.
pub fn dedupe_key(candidate: &PartnerCandidate) -> String {
    let name = candidate.partner_name.trim().to_lowercase();
    let host = website_host(candidate)
        .or_else(|| candidate.source_url.as_deref().and_then(normalized_host))
        .unwrap_or_default();
    format!("{}::{}", name, host)
}

fn website_host(candidate: &PartnerCandidate) -> Option<String> {
    let website = candidate.website.as_deref()?.trim();
    if website.is_empty() {
        return None;
    }
    if is_relative_reference(website) {
        let base = Url::parse(candidate.source_url.as_deref()?).ok()?;
        return normalized_host(base.join(website).ok()?.as_str());
    }
    normalized_host(website)
}

/// `/apps/slack`, `./slack`, `?id=3`: links that only make sense against a page.
fn is_relative_reference(raw: &str) -> bool {
    raw.starts_with(['/', '.', '?', '#']) && !raw.starts_with("//")
}

/// Lowercased host of a URL-ish string, without a leading `www.`.
///
/// Bare domains (`stripe.com/partners`) are read as https URLs and
/// protocol-relative links (`//cdn.stripe.com`) as https. Relative paths
/// have no host.
pub fn normalized_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || is_relative_reference(raw) {
        return None;
    }
    let parsed = Url::parse(raw)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{}", raw.trim_start_matches('/'))).ok())?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Collapse candidates to one per key, keeping first occurrences in order.
///
/// Candidates with a blank name are dropped along with repeats.
pub fn dedupe(candidates: impl IntoIterator<Item = PartnerCandidate>) -> Deduped {
    let mut dedup = Deduplicator::new();
    let dropped_count = dedup.extend(candidates);
    Deduped {
        unique: dedup.into_unique(),
        dropped_count,
    }
}

/// Running deduplicator for a whole discovery run.
///
/// Each extraction round is merged into the same instance so later rounds
/// dedupe against everything accumulated so far.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    unique: Vec<PartnerCandidate>,
    dropped: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch, returning how many of its candidates were dropped.
    pub fn extend(&mut self, batch: impl IntoIterator<Item = PartnerCandidate>) -> usize {
        let mut dropped = 0;
        for candidate in batch {
            if candidate.partner_name.trim().is_empty() || !self.seen.insert(dedupe_key(&candidate)) {
                dropped += 1;
                continue;
            }
            self.unique.push(candidate);
        }
        self.dropped += dropped;
        dropped
    }

    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Total dropped across every batch so far.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    pub fn unique(&self) -> &[PartnerCandidate] {
        &self.unique
    }

    pub fn into_unique(self) -> Vec<PartnerCandidate> {
        self.unique
    }
}
