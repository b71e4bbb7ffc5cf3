//! Extractor implementations.
//!
//! - [`FirecrawlDirectory`] - Firecrawl extraction and mapping
//! - [`RateLimitedExtractor`] - request-rate wrapper for either role

pub mod firecrawl;
pub mod rate_limited;

pub use firecrawl::{
    partner_schema, to_candidates, ExtractResponse, ExtractedPartner, FirecrawlDirectory,
    PartnerListings, PARTNER_PROMPT,
};
pub use rate_limited::{RateLimitExt, RateLimitedExtractor};
