//! Discovery pipeline.
//!
//! The pipeline orchestrates:
//! - Cache lookup and per-site run serialization
//! - Fast-path extraction from guessed directory URLs
//! - Site mapping and shortlist extraction
//! - The bounded agentic fallback
//! - Termination reason assignment and the run trace

pub mod agentic;
pub mod discovery;
pub mod state;

pub use agentic::{agentic_inputs, attempts_per_url, run_agentic, AgenticAttempt, AgenticReport};
pub use discovery::{Discovery, DiscoveryOutcome, DEFAULT_REQUEST_TIMEOUT};
pub use state::{termination_reason, Stage, TerminationReason};

use crate::dedupe::Deduplicator;
use crate::types::candidate::PartnerCandidate;

/// Keep the usable candidates of a batch and merge them into the run.
///
/// Returns `(added, dropped_as_duplicate)`.
pub(crate) fn merge_usable(
    dedup: &mut Deduplicator,
    batch: Vec<PartnerCandidate>,
) -> (usize, usize) {
    let before = dedup.len();
    let dropped = dedup.extend(batch.into_iter().filter(PartnerCandidate::is_usable));
    (dedup.len() - before, dropped)
}
