//! Run configuration for the dumper

use std::path::PathBuf;

use crate::filter::NameFilter;

/// Subscription topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Every runtime, rundown and sample-profiler event, plus the catch-all stream
    DumpAll,
    /// Runtime and rundown events, decoded samples, and a warning for anything unclaimed
    #[default]
    DumpSamples,
}

impl Mode {
    /// Mode selected by the `--all` flag
    pub fn from_all_flag(all: bool) -> Self {
        if all {
            Mode::DumpAll
        } else {
            Mode::DumpSamples
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::DumpAll => f.write_str("dump-all"),
            Mode::DumpSamples => f.write_str("dump-samples"),
        }
    }
}

/// Dumper configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Subscription topology
    pub mode: Mode,

    /// Regular expression matched against event names (None = dump everything)
    pub event_pattern: Option<String>,

    /// Trace file to read
    pub trace_path: PathBuf,
}

impl Config {
    pub fn new(trace_path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::default(),
            event_pattern: None,
            trace_path: trace_path.into(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.trace_path.as_os_str().is_empty() {
            anyhow::bail!("Trace file path must not be empty");
        }

        NameFilter::new(self.event_pattern.as_deref())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(Mode::from_all_flag(true), Mode::DumpAll);
        assert_eq!(Mode::from_all_flag(false), Mode::DumpSamples);
        assert_eq!(Mode::default(), Mode::DumpSamples);
    }

    #[test]
    fn test_config_validation() {
        let valid = Config {
            event_pattern: Some("GC/.*".to_string()),
            ..Config::new("app.trace")
        };
        assert!(valid.validate().is_ok());

        let bad_pattern = Config {
            event_pattern: Some("GC/(".to_string()),
            ..Config::new("app.trace")
        };
        assert!(bad_pattern.validate().is_err());

        assert!(Config::new("").validate().is_err());
    }
}
