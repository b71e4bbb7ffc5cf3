//! Stage progression and termination reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of a discovery run, in the order they can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    CacheCheck,
    FastPath,
    MapAndExtract,
    Agentic,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::CacheCheck => "cache_check",
            Stage::FastPath => "fast_path",
            Stage::MapAndExtract => "map_and_extract",
            Stage::Agentic => "agentic",
            Stage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a discovery run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Enough partners without the fallback, or the fallback was never reached
    MapExtractSuccess,
    /// The fallback ran and found some, but fewer than the threshold
    AgenticFallbackSuccess,
    /// Nothing found
    NoDirectoryFound,
    /// Nothing found and every external call errored
    Failed,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::MapExtractSuccess => "map_extract_success",
            TerminationReason::AgenticFallbackSuccess => "agentic_fallback_success",
            TerminationReason::NoDirectoryFound => "no_directory_found",
            TerminationReason::Failed => "failed",
        }
    }

    /// Whether the run produced any partners.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TerminationReason::MapExtractSuccess | TerminationReason::AgenticFallbackSuccess
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assign the termination reason for a finished run.
///
/// `last_stage` is the furthest extraction stage the run entered.
/// `service_unavailable` is true when at least one external call was made
/// and all of them errored.
pub fn termination_reason(
    last_stage: Stage,
    final_count: usize,
    agentic_threshold: usize,
    service_unavailable: bool,
) -> TerminationReason {
    if final_count == 0 {
        return if service_unavailable {
            TerminationReason::Failed
        } else {
            TerminationReason::NoDirectoryFound
        };
    }
    if final_count >= agentic_threshold {
        return TerminationReason::MapExtractSuccess;
    }
    if last_stage >= Stage::Agentic {
        TerminationReason::AgenticFallbackSuccess
    } else {
        TerminationReason::MapExtractSuccess
    }
}
