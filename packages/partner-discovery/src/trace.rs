//! Run trace: an ordered, append-only record of what a discovery run did.
//!
//! Callers render this for operators (the run summary reads the
//! `extract_summary` step) and may persist it alongside the job. Each step
//! name has its own payload type, so the wire shape stays
//! `{ "step": "...", "info": { ... } }` while the Rust side stays typed.

use serde::{Deserialize, Serialize};

use crate::pipeline::{agentic::AgenticAttempt, state::TerminationReason};
use crate::types::config::{DiscoveryConfig, DiscoveryMode};

/// One step in a discovery trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "info", rename_all = "snake_case")]
pub enum TraceEntry {
    Config(ConfigInfo),
    CacheHit(CacheHitInfo),
    FastPathCandidates(FastPathInfo),
    Map(MapInfo),
    MapError(MapErrorInfo),
    ExtractSummary(ExtractSummary),
    /// Written by callers when a run aborts; the pipeline never records it
    Error(ErrorInfo),
}

impl TraceEntry {
    /// The step name as it appears on the wire.
    pub fn step(&self) -> &'static str {
        match self {
            TraceEntry::Config(_) => "config",
            TraceEntry::CacheHit(_) => "cache_hit",
            TraceEntry::FastPathCandidates(_) => "fast_path_candidates",
            TraceEntry::Map(_) => "map",
            TraceEntry::MapError(_) => "map_error",
            TraceEntry::ExtractSummary(_) => "extract_summary",
            TraceEntry::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInfo {
    pub mode: DiscoveryMode,
    pub seed_url: String,
    pub config: DiscoveryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHitInfo {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastPathInfo {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapInfo {
    pub total_urls: usize,
    pub filtered_urls: usize,
    pub shortlist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub message: String,
}

/// Final run summary, written once when the run finalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractSummary {
    pub termination_reason: TerminationReason,
    pub final_partner_count: usize,
    pub shortlisted_count: usize,
    /// Number of URLs an extraction call was issued for
    pub extracted_count: usize,
    pub dedupe_dropped_count: usize,
    pub agentic_ran: bool,
    #[serde(default)]
    pub agentic_attempts: Vec<AgenticAttempt>,
    #[serde(default)]
    pub failed_extractions: usize,
}

/// Collects trace entries for a single run.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    entries: Vec<TraceEntry>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: TraceEntry) {
        tracing::debug!(step = entry.step(), "trace");
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The run summary, if the run got as far as finalizing.
    pub fn summary(&self) -> Option<&ExtractSummary> {
        summary_of(&self.entries)
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        termination_reason_of(&self.entries)
    }
}

/// Find the `extract_summary` step in a trace.
pub fn summary_of(entries: &[TraceEntry]) -> Option<&ExtractSummary> {
    entries.iter().find_map(|e| match e {
        TraceEntry::ExtractSummary(s) => Some(s),
        _ => None,
    })
}

/// Termination reason as recorded in a trace's summary step.
pub fn termination_reason_of(entries: &[TraceEntry]) -> Option<TerminationReason> {
    summary_of(entries).map(|s| s.termination_reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(reason: TerminationReason) -> ExtractSummary {
        ExtractSummary {
            termination_reason: reason,
            final_partner_count: 3,
            shortlisted_count: 2,
            extracted_count: 4,
            dedupe_dropped_count: 1,
            agentic_ran: false,
            agentic_attempts: vec![],
            failed_extractions: 0,
        }
    }

    #[test]
    fn test_entries_serialize_as_step_and_info() {
        let entry = TraceEntry::Map(MapInfo {
            total_urls: 120,
            filtered_urls: 7,
            shortlist: vec!["https://a.com/partners".into()],
        });
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["step"], "map");
        assert_eq!(value["info"]["totalUrls"], 120);
        assert_eq!(value["info"]["filteredUrls"], 7);
    }

    #[test]
    fn test_summary_wire_shape() {
        let entry = TraceEntry::ExtractSummary(summary(TerminationReason::MapExtractSuccess));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["step"], "extract_summary");
        assert_eq!(value["info"]["terminationReason"], "map_extract_success");
        assert_eq!(value["info"]["finalPartnerCount"], 3);
        assert_eq!(value["info"]["dedupeDroppedCount"], 1);
        assert_eq!(value["info"]["agenticRan"], false);
    }

    #[test]
    fn test_step_names_match_wire_tags() {
        let entries = vec![
            TraceEntry::CacheHit(CacheHitInfo {
                key: "a.com::standard".into(),
                count: 2,
            }),
            TraceEntry::FastPathCandidates(FastPathInfo { urls: vec![] }),
            TraceEntry::MapError(MapErrorInfo {
                status: Some(500),
                message: "boom".into(),
            }),
        ];
        for entry in entries {
            let value = serde_json::to_value(&entry).unwrap();
            assert_eq!(value["step"], entry.step());
        }
    }

    #[test]
    fn test_recorder_preserves_order_and_finds_summary() {
        let mut recorder = TraceRecorder::new();
        assert!(recorder.summary().is_none());

        recorder.record(TraceEntry::FastPathCandidates(FastPathInfo {
            urls: vec!["https://a.com/partners".into()],
        }));
        recorder.record(TraceEntry::ExtractSummary(summary(
            TerminationReason::NoDirectoryFound,
        )));

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.entries()[0].step(), "fast_path_candidates");
        assert_eq!(
            recorder.termination_reason(),
            Some(TerminationReason::NoDirectoryFound)
        );
    }

    #[test]
    fn test_trace_roundtrips_through_json() {
        let entry = TraceEntry::MapError(MapErrorInfo {
            status: None,
            message: "timed out".into(),
        });
        let json = serde_json::to_string(&entry).unwrap();
        let back: TraceEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
