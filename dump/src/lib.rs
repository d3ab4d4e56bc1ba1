//! Trace dumper library
//!
//! Turns a `.trace` recording into a text dump: the event source pushes
//! decoded events to the subscriptions the router sets up for a mode, each
//! subscription gates on the name filter, and the sink writes what passes.

pub mod config;
pub mod driver;
pub mod filter;
pub mod router;
pub mod sink;
pub mod source;

pub use config::{Config, Mode};
pub use driver::run;
pub use filter::NameFilter;
pub use source::{EventSource, ProcessStats, SourceError};
