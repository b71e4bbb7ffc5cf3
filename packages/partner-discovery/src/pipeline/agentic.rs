//! Bounded fallback loop over the best known directory pages.
//!
//! Runs only when the earlier stages came in under the agentic threshold.
//! It re-extracts from the shortlist (or a couple of fast-path guesses when
//! mapping produced nothing) and stops on page budget or partner volume.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

use crate::dedupe::Deduplicator;
use crate::error::Result;
use crate::pipeline::merge_usable;
use crate::types::{candidate::PartnerCandidate, config::DiscoveryConfig};

/// Fast-path guesses the fallback falls back to when there is no shortlist.
pub const FAST_PATH_FALLBACK_URLS: usize = 2;

/// One visit made by the fallback loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgenticAttempt {
    pub url: String,
    /// Whether a follow-up page of the same directory was requested
    pub pagination_attempted: bool,
    /// Candidates the service returned, before filtering and dedupe
    pub partners_extracted: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the fallback loop did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgenticReport {
    pub attempts: Vec<AgenticAttempt>,
    /// Candidates that survived filtering and dedupe
    pub added: usize,
    pub dropped: usize,
    pub failed: usize,
}

/// URLs the fallback should visit, best first.
pub fn agentic_inputs(shortlist: &[String], fast_path: &[String]) -> Vec<String> {
    if shortlist.is_empty() {
        fast_path
            .iter()
            .take(FAST_PATH_FALLBACK_URLS)
            .cloned()
            .collect()
    } else {
        shortlist.to_vec()
    }
}

/// Extraction attempts per visited URL. Pagination is not followed yet, so
/// this is one, or zero when the config forbids any attempt.
pub fn attempts_per_url(config: &DiscoveryConfig) -> usize {
    config.agentic_max_pagination_attempts.min(1)
}

/// Run the fallback loop.
///
/// `extract` performs one guarded extraction call. Fatal errors from it
/// (cancellation) end the loop and propagate; any other error is recorded on
/// the attempt and the loop moves on.
pub async fn run_agentic<F, Fut>(
    urls: &[String],
    config: &DiscoveryConfig,
    dedup: &mut Deduplicator,
    mut extract: F,
) -> Result<AgenticReport>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<PartnerCandidate>>>,
{
    let mut report = AgenticReport::default();
    if attempts_per_url(config) == 0 {
        debug!("Agentic pagination budget is zero; skipping");
        return Ok(report);
    }

    let budget = config.agentic_max_directory_pages;
    let mut running_total = dedup.len();

    for url in urls.iter().take(budget) {
        if running_total >= config.max_partners || dedup.len() >= config.stage_cap() {
            debug!(running_total, "Agentic volume reached; stopping");
            break;
        }

        match extract(url.clone()).await {
            Ok(batch) => {
                let extracted = batch.len();
                running_total += extracted;
                let (added, dropped) = merge_usable(dedup, batch);
                report.added += added;
                report.dropped += dropped;
                debug!(url = %url, extracted, added, "Agentic attempt");
                report.attempts.push(AgenticAttempt {
                    url: url.clone(),
                    pagination_attempted: false,
                    partners_extracted: extracted,
                    error: None,
                });
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(url = %url, error = %e, "Agentic extraction failed");
                report.failed += 1;
                report.attempts.push(AgenticAttempt {
                    url: url.clone(),
                    pagination_attempted: false,
                    partners_extracted: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    info!(
        visited = report.attempts.len(),
        added = report.added,
        failed = report.failed,
        "Agentic fallback finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use crate::testing::sample_partners;
    use crate::types::config::DiscoveryMode;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://a.com/partners/{}", i)).collect()
    }

    #[test]
    fn test_inputs_prefer_shortlist() {
        let shortlist = vec!["https://a.com/integrations".to_string()];
        let fast = urls(5);
        assert_eq!(agentic_inputs(&shortlist, &fast), shortlist);
        assert_eq!(agentic_inputs(&[], &fast), fast[..2].to_vec());
        assert!(agentic_inputs(&[], &[]).is_empty());
    }

    #[test]
    fn test_attempts_per_url_is_bounded() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Aggressive);
        assert_eq!(attempts_per_url(&config), 1);

        let mut config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        config.agentic_max_pagination_attempts = 0;
        assert_eq!(attempts_per_url(&config), 0);
    }

    #[tokio::test]
    async fn test_page_budget_is_respected() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        let mut dedup = Deduplicator::new();
        let report = run_agentic(&urls(10), &config, &mut dedup, |_| async { Ok(vec![]) })
            .await
            .unwrap();
        assert_eq!(report.attempts.len(), config.agentic_max_directory_pages);
        assert!(report.attempts.iter().all(|a| !a.pagination_attempted));
    }

    #[tokio::test]
    async fn test_zero_pagination_budget_visits_nothing() {
        let mut config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        config.agentic_max_pagination_attempts = 0;
        let mut dedup = Deduplicator::new();
        let report = run_agentic(&urls(3), &config, &mut dedup, |_| async {
            Ok(sample_partners("X", 1))
        })
        .await
        .unwrap();
        assert!(report.attempts.is_empty());
        assert!(dedup.is_empty());
    }

    #[tokio::test]
    async fn test_exits_on_running_total() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Standard).with_max_partners(4);
        let mut dedup = Deduplicator::new();
        let mut n = 0;
        let report = run_agentic(&urls(3), &config, &mut dedup, |_| {
            n += 1;
            let batch = sample_partners(&format!("P{}", n), 4);
            async move { Ok(batch) }
        })
        .await
        .unwrap();
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.added, 4);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_skipped() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        let mut dedup = Deduplicator::new();
        let report = run_agentic(&urls(2), &config, &mut dedup, |url| async move {
            if url.ends_with("/0") {
                Err(DiscoveryError::ExtractionFailed {
                    url,
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(sample_partners("Ok", 2))
            }
        })
        .await
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.attempts[0].partners_extracted, 0);
        assert!(report.attempts[0].error.as_deref().unwrap().contains("500"));
        assert_eq!(report.attempts[1].partners_extracted, 2);
        assert_eq!(dedup.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_propagates() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        let mut dedup = Deduplicator::new();
        let result = run_agentic(&urls(2), &config, &mut dedup, |_| async {
            Err(DiscoveryError::Cancelled)
        })
        .await;
        assert!(matches!(result, Err(DiscoveryError::Cancelled)));
    }
}
