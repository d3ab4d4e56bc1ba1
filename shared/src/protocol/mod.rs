//! Trace container format
//!
//! A `.trace` file is a short header followed by length-prefixed event
//! records. See [`wire`] for the layout.

pub mod wire;
