//! Partner Directory Discovery
//!
//! Takes one seed URL and a mode, and returns a deduplicated, bounded list of
//! partner and integration candidates found on the site's directory pages,
//! together with a trace explaining how the run got there.
//!
//! # Design Philosophy
//!
//! - Cheap guesses first, mapping second, the fallback loop last
//! - Every stage stops as soon as enough partners are in hand
//! - A flaky extraction service degrades results, never the run
//! - The trace says why the run stopped
//!
//! # Usage
//!
//! ```rust,ignore
//! use partner_discovery::{Discovery, DiscoveryMode, Settings};
//!
//! let settings = Settings::from_env()?;
//! let firecrawl = settings.firecrawl_directory()?;
//! let discovery = Discovery::new(firecrawl.clone(), firecrawl)
//!     .with_request_timeout(settings.request_timeout);
//!
//! let outcome = discovery
//!     .discover_partners("https://stripe.com", DiscoveryMode::Standard)
//!     .await?;
//! println!("{} partners ({})", outcome.results.len(), outcome.termination_reason);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams to the extraction service, mapping service and clock
//! - [`types`] - Candidates and per-mode configuration
//! - [`pipeline`] - The orchestrator, stage state machine and fallback loop
//! - [`candidates`] - Fast-path URL guesses
//! - [`directory`] - Map-output filtering and shortlist ranking
//! - [`dedupe`] - Candidate deduplication
//! - [`cache`] - Process-wide result cache
//! - [`trace`] - Run trace
//! - [`extractors`] - Firecrawl implementation and rate limiting
//! - [`jobs`] - In-process run log
//! - [`testing`] - Mock implementations for testing

pub mod cache;
pub mod candidates;
pub mod dedupe;
pub mod directory;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod pipeline;
pub mod security;
pub mod settings;
pub mod testing;
pub mod trace;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{DiscoveryError, Result};
pub use traits::{
    clock::{Clock, SystemClock},
    extractor::PartnerExtractor,
    mapper::{DirectoryMapper, MapRequest},
};
pub use types::{
    candidate::PartnerCandidate,
    config::{DiscoveryConfig, DiscoveryConfigs, DiscoveryMode, STAGE_SOFT_CAP},
};

pub use cache::{normalize_host, CacheEntry, CacheKey, ResultCache};
pub use candidates::candidate_urls;
pub use dedupe::{dedupe, Deduped, Deduplicator};
pub use directory::{find_directory_pages, shortlist_urls, DirectoryPages};
pub use pipeline::{
    AgenticAttempt, Discovery, DiscoveryOutcome, Stage, TerminationReason,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use trace::{ExtractSummary, TraceEntry, TraceRecorder};

pub use extractors::{FirecrawlDirectory, RateLimitExt, RateLimitedExtractor};
pub use jobs::{JobLog, JobLogEntry, JobStatus, JobUpdate};
pub use security::SecretString;
pub use settings::Settings;

// Re-export testing utilities
pub use testing::{FakeClock, MockExtractor, MockMapper};
