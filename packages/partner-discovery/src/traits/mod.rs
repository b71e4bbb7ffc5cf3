//! Seams between the pipeline and the outside world.
//!
//! The orchestrator only talks to external services and the wall clock
//! through these traits, so tests can swap in the doubles from
//! [`crate::testing`].

pub mod clock;
pub mod extractor;
pub mod mapper;
