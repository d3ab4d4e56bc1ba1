//! Event name filter
//!
//! Built once from the `--event` pattern and shared read-only by every
//! handler.

use regex::Regex;
use trace2txt_shared::DecodedEvent;

#[derive(Debug, thiserror::Error)]
#[error("invalid event pattern {pattern:?}")]
pub struct FilterError {
    pattern: String,
    #[source]
    source: regex::Error,
}

/// Optional regular expression over event names
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    pattern: Option<Regex>,
}

impl NameFilter {
    /// Compile `pattern`. `None` matches every event.
    pub fn new(pattern: Option<&str>) -> Result<Self, FilterError> {
        let pattern = pattern
            .map(|p| {
                Regex::new(p).map_err(|source| FilterError {
                    pattern: p.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self { pattern })
    }

    /// A filter that lets everything through
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// True if the pattern matches anywhere in the event's name
    pub fn matches<E: DecodedEvent + ?Sized>(&self, event: &E) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(&event.name()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace2txt_shared::TraceEvent;

    fn event(provider: &str, name: &str) -> TraceEvent {
        TraceEvent {
            timestamp_ns: 0,
            process_id: 1,
            thread_id: 1,
            provider: provider.to_string(),
            event_id: 0,
            event_name: name.to_string(),
            payload: vec![],
        }
    }

    #[test]
    fn test_no_pattern_matches_everything() {
        let filter = NameFilter::new(None).unwrap();
        assert!(filter.pattern().is_none());
        assert!(filter.matches(&event("Runtime", "Foo")));
        assert!(filter.matches(&event("", "")));
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let filter = NameFilter::new(Some("Foo")).unwrap();
        assert!(filter.matches(&event("Runtime", "Foo")));
        assert!(filter.matches(&event("Runtime", "FooBar/Start")));
        assert!(!filter.matches(&event("SampleProfiler", "ThreadSample")));
    }

    #[test]
    fn test_pattern_sees_provider() {
        let filter = NameFilter::new(Some("^Rundown/")).unwrap();
        assert!(filter.matches(&event("Rundown", "MethodDCEnd")));
        assert!(!filter.matches(&event("Runtime", "Rundown/Fake")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = NameFilter::new(Some("(")).unwrap_err();
        assert_eq!(err.to_string(), "invalid event pattern \"(\"");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches("invalid event pattern").count(), 1);
        assert!(chain.starts_with("invalid event pattern \"(\": "));
    }
}
