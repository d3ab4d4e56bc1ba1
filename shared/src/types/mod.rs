//! Decoded event types

pub mod events;
pub mod samples;
