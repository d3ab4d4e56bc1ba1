//! Shared types and utilities for trace2txt
//!
//! This crate contains the decoded event model, the sample-profiler record
//! views, and the `.trace` container format read by the dumper.

pub mod protocol;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{events::*, samples::*};
