//! Data types shared across the pipeline.

pub mod candidate;
pub mod config;
