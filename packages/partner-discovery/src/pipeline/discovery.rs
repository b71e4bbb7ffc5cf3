//! Discovery orchestrator.
//!
//! One call to [`Discovery::discover_partners`] walks the stages
//! `Start → CacheCheck → FastPath → MapAndExtract → Agentic → Finalize`,
//! skipping the later ones as soon as enough partners are in hand.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{normalize_host, CacheEntry, CacheKey, ResultCache};
use crate::candidates::candidate_urls;
use crate::dedupe::Deduplicator;
use crate::directory::{find_directory_pages, DirectoryPages};
use crate::error::{DiscoveryError, Result};
use crate::pipeline::agentic::{agentic_inputs, run_agentic, AgenticAttempt};
use crate::pipeline::merge_usable;
use crate::pipeline::state::{termination_reason, Stage, TerminationReason};
use crate::trace::{
    CacheHitInfo, ConfigInfo, ExtractSummary, FastPathInfo, MapErrorInfo, MapInfo, TraceEntry,
    TraceRecorder,
};
use crate::traits::{extractor::PartnerExtractor, mapper::DirectoryMapper};
use crate::types::{
    candidate::PartnerCandidate,
    config::{DiscoveryConfig, DiscoveryConfigs, DiscoveryMode},
};

/// Per-call limit on extraction and mapping requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What a discovery run returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryOutcome {
    pub job_id: String,
    pub results: Vec<PartnerCandidate>,
    pub trace: Vec<TraceEntry>,
    pub termination_reason: TerminationReason,
}

impl DiscoveryOutcome {
    /// Whether this outcome was served from the cache.
    pub fn from_cache(&self) -> bool {
        self.trace
            .iter()
            .any(|e| matches!(e, TraceEntry::CacheHit(_)))
    }

    /// The run summary, absent for cache hits.
    pub fn summary(&self) -> Option<&ExtractSummary> {
        crate::trace::summary_of(&self.trace)
    }
}

/// State threaded through one run.
struct DiscoveryRun {
    seed_url: String,
    config: DiscoveryConfig,
    stage: Stage,
    dedup: Deduplicator,
    trace: TraceRecorder,
    shortlist: Vec<String>,
    extracted_count: usize,
    calls_made: usize,
    extraction_failures: usize,
    map_failed: bool,
    agentic_attempts: Vec<AgenticAttempt>,
}

impl DiscoveryRun {
    fn new(seed_url: &str, config: DiscoveryConfig) -> Self {
        Self {
            seed_url: seed_url.to_string(),
            config,
            stage: Stage::Start,
            dedup: Deduplicator::new(),
            trace: TraceRecorder::new(),
            shortlist: Vec::new(),
            extracted_count: 0,
            calls_made: 0,
            extraction_failures: 0,
            map_failed: false,
            agentic_attempts: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(seed = %self.seed_url, from = %self.stage, to = %stage, "Stage transition");
        self.stage = stage;
    }

    /// Below the agentic threshold and the per-stage volume cap.
    fn wants_more(&self) -> bool {
        self.dedup.len() < self.config.agentic_threshold && self.dedup.len() < self.config.stage_cap()
    }
}

/// The discovery orchestrator.
///
/// Generic over the extraction and mapping services. Share one
/// [`ResultCache`] between every orchestrator in a process.
pub struct Discovery<E, M> {
    extractor: E,
    mapper: M,
    cache: Arc<ResultCache>,
    configs: DiscoveryConfigs,
    request_timeout: Duration,
}

impl<E: PartnerExtractor, M: DirectoryMapper> Discovery<E, M> {
    /// Create an orchestrator with its own cache and the static mode table.
    pub fn new(extractor: E, mapper: M) -> Self {
        Self {
            extractor,
            mapper,
            cache: Arc::new(ResultCache::new()),
            configs: DiscoveryConfigs::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Use a shared cache.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the mode table.
    pub fn with_configs(mut self, configs: DiscoveryConfigs) -> Self {
        self.configs = configs;
        self
    }

    /// Override the config for one mode.
    pub fn with_config(mut self, mode: DiscoveryMode, config: DiscoveryConfig) -> Self {
        self.configs = self.configs.with(mode, config);
        self
    }

    /// Set the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn config(&self, mode: DiscoveryMode) -> &DiscoveryConfig {
        self.configs.get(mode)
    }

    /// Discover partners for a seed URL.
    pub async fn discover_partners(
        &self,
        seed_url: &str,
        mode: DiscoveryMode,
    ) -> Result<DiscoveryOutcome> {
        self.discover_partners_with_cancel(seed_url, mode, &CancellationToken::new())
            .await
    }

    /// Discover partners, aborting with [`DiscoveryError::Cancelled`] when
    /// `cancel` fires. A cancelled run caches nothing.
    pub async fn discover_partners_with_cancel(
        &self,
        seed_url: &str,
        mode: DiscoveryMode,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryOutcome> {
        self.extractor.ensure_configured()?;
        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        let config = self.configs.get(mode).clone();
        let mut run = DiscoveryRun::new(seed_url, config.clone());
        run.trace.record(TraceEntry::Config(ConfigInfo {
            mode,
            seed_url: seed_url.to_string(),
            config: config.clone(),
        }));

        info!(seed = %seed_url, %mode, extractor = self.extractor.name(), "Starting partner discovery");

        // Cache check, under the per-key lock so concurrent runs coalesce
        run.enter(Stage::CacheCheck);
        let host = normalize_host(seed_url).unwrap_or_else(|e| {
            debug!(error = %e, "Seed is not a URL; keying cache on raw input");
            seed_url.trim().to_ascii_lowercase()
        });
        let key = CacheKey::new(host, mode);
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
            guard = self.cache.lock_key(&key) => guard,
        };

        if let Some(entry) = self.cache.get(&key) {
            return Ok(self.cache_hit(run, &key, entry));
        }

        // Fast path
        run.enter(Stage::FastPath);
        let fast_path = candidate_urls(seed_url);
        run.trace.record(TraceEntry::FastPathCandidates(FastPathInfo {
            urls: fast_path.clone(),
        }));
        self.extract_round(&mut run, &fast_path, cancel).await?;
        info!(count = run.dedup.len(), "Fast path complete");

        // Map and extract
        if run.wants_more() {
            run.enter(Stage::MapAndExtract);
            run.calls_made += 1;
            let mapped = self
                .guarded("map", seed_url, cancel, find_directory_pages(&self.mapper, seed_url, &config))
                .await;
            match mapped {
                Ok(DirectoryPages {
                    shortlist,
                    total_urls,
                    filtered_urls,
                }) => {
                    run.trace.record(TraceEntry::Map(MapInfo {
                        total_urls,
                        filtered_urls,
                        shortlist: shortlist.clone(),
                    }));
                    run.shortlist = shortlist;
                    let shortlist = run.shortlist.clone();
                    self.extract_round(&mut run, &shortlist, cancel).await?;
                    info!(count = run.dedup.len(), "Shortlist extraction complete");
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(seed = %seed_url, error = %e, "Mapping failed; continuing without shortlist");
                    run.map_failed = true;
                    run.trace.record(TraceEntry::MapError(MapErrorInfo {
                        status: e.status(),
                        message: e.to_string(),
                    }));
                }
            }
        }

        // Agentic fallback
        if run.wants_more() {
            run.enter(Stage::Agentic);
            let inputs = agentic_inputs(&run.shortlist, &fast_path);
            let this = self;
            let report = run_agentic(&inputs, &config, &mut run.dedup, move |url| async move {
                this.guarded_extract(&url, cancel).await
            })
            .await?;

            run.extracted_count += report.attempts.len();
            run.calls_made += report.attempts.len();
            run.extraction_failures += report.failed;
            run.agentic_attempts = report.attempts;
        }

        Ok(self.finalize(run, key))
    }

    fn cache_hit(&self, mut run: DiscoveryRun, key: &CacheKey, entry: CacheEntry) -> DiscoveryOutcome {
        let mut results = entry.results;
        results.truncate(run.config.max_partners);

        run.trace.record(TraceEntry::CacheHit(CacheHitInfo {
            key: key.to_string(),
            count: results.len(),
        }));
        info!(%key, count = results.len(), "Serving discovery from cache");

        let reason = termination_reason(
            Stage::CacheCheck,
            results.len(),
            run.config.agentic_threshold,
            false,
        );

        DiscoveryOutcome {
            job_id: format!(
                "cache:{}:{}:{}",
                key.host,
                key.mode,
                entry.expires_at.timestamp()
            ),
            results,
            trace: run.trace.into_entries(),
            termination_reason: reason,
        }
    }

    fn finalize(&self, mut run: DiscoveryRun, key: CacheKey) -> DiscoveryOutcome {
        let last_stage = run.stage;
        run.enter(Stage::Finalize);

        let dedupe_dropped_count = run.dedup.dropped_count();
        let mut results = run.dedup.into_unique();
        results.truncate(run.config.max_partners);

        let calls_failed = run.extraction_failures + usize::from(run.map_failed);
        let service_unavailable = run.calls_made > 0 && calls_failed == run.calls_made;
        let reason = termination_reason(
            last_stage,
            results.len(),
            run.config.agentic_threshold,
            service_unavailable,
        );

        run.trace.record(TraceEntry::ExtractSummary(ExtractSummary {
            termination_reason: reason,
            final_partner_count: results.len(),
            shortlisted_count: run.shortlist.len(),
            extracted_count: run.extracted_count,
            dedupe_dropped_count,
            agentic_ran: last_stage == Stage::Agentic,
            agentic_attempts: run.agentic_attempts,
            failed_extractions: run.extraction_failures,
        }));

        self.cache
            .put(key, results.clone(), run.shortlist, run.config.cache_ttl);

        info!(
            seed = %run.seed_url,
            count = results.len(),
            reason = %reason,
            "Partner discovery complete"
        );

        DiscoveryOutcome {
            job_id: Uuid::new_v4().to_string(),
            results,
            trace: run.trace.into_entries(),
            termination_reason: reason,
        }
    }

    /// Extract from each URL in turn, stopping at the stage volume cap.
    async fn extract_round(
        &self,
        run: &mut DiscoveryRun,
        urls: &[String],
        cancel: &CancellationToken,
    ) -> Result<()> {
        for url in urls {
            if run.dedup.len() >= run.config.stage_cap() {
                debug!(count = run.dedup.len(), "Stage cap reached");
                break;
            }

            run.extracted_count += 1;
            run.calls_made += 1;
            match self.guarded_extract(url, cancel).await {
                Ok(batch) => {
                    let (added, dropped) = merge_usable(&mut run.dedup, batch);
                    debug!(url = %url, added, dropped, "Extracted");
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(url = %url, error = %e, "Extraction failed; skipping URL");
                    run.extraction_failures += 1;
                }
            }
        }
        Ok(())
    }

    async fn guarded_extract(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PartnerCandidate>> {
        self.guarded("extract", url, cancel, self.extractor.extract(url))
            .await
    }

    /// Race an external call against the timeout and the cancel token.
    async fn guarded<T>(
        &self,
        operation: &'static str,
        url: &str,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DiscoveryError::Cancelled),
            outcome = tokio::time::timeout(self.request_timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(DiscoveryError::Timeout {
                    operation,
                    url: url.to_string(),
                }),
            },
        }
    }
}

impl<E, M> std::fmt::Debug for Discovery<E, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("cache", &self.cache)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
