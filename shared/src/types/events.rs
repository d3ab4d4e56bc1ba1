//! Event type definitions for decoded trace records
//!
//! These types represent the events stored in a `.trace` container and
//! handed to subscribers by the event source.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Write as _;

use crate::utils::time::format_msec;

/// Timestamp in nanoseconds since the start of the trace
pub type Timestamp = u64;

/// Process ID
pub type Pid = u32;

/// Thread ID
pub type Tid = u64;

/// Provider emitting the core runtime events (GC, JIT, exceptions, ...)
pub const RUNTIME_PROVIDER: &str = "Microsoft-Windows-DotNETRuntime";

/// Provider emitting rundown events at the end of a session
pub const RUNDOWN_PROVIDER: &str = "Microsoft-Windows-DotNETRuntimeRundown";

/// Provider emitting periodic call-stack samples
pub const SAMPLE_PROFILER_PROVIDER: &str = "Microsoft-DotNETCore-SampleProfiler";

/// Provider category, used to route events to subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Runtime,
    Rundown,
    SampleProfiler,
    Other,
}

impl Category {
    /// Classify a provider name.
    ///
    /// Short aliases (`Runtime`, `Rundown`, `SampleProfiler`) are accepted so
    /// hand-written traces don't need the full provider names.
    pub fn from_provider(provider: &str) -> Self {
        match provider {
            RUNTIME_PROVIDER | "Runtime" => Category::Runtime,
            RUNDOWN_PROVIDER | "Rundown" => Category::Rundown,
            SAMPLE_PROFILER_PROVIDER | "SampleProfiler" => Category::SampleProfiler,
            _ => Category::Other,
        }
    }
}

/// Typed payload value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Address(u64),
    Addresses(Vec<u64>),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::UInt(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            FieldValue::Str(v) => f.write_str(v),
            FieldValue::Address(v) => write!(f, "0x{:x}", v),
            FieldValue::Addresses(v) => {
                for (i, addr) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "0x{:x}", addr)?;
                }
                Ok(())
            }
        }
    }
}

/// Named payload field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A decoded trace event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Time since the start of the trace
    pub timestamp_ns: Timestamp,

    /// Process that emitted the event
    pub process_id: Pid,

    /// Thread that emitted the event
    pub thread_id: Tid,

    /// Provider name (e.g. `Microsoft-Windows-DotNETRuntime`)
    pub provider: String,

    /// Provider-local event ID
    pub event_id: u16,

    /// Event name within the provider (e.g. `GC/Start`)
    pub event_name: String,

    /// Event fields, in declaration order
    #[serde(default)]
    pub payload: Vec<Field>,
}

impl TraceEvent {
    /// Provider category of this event
    pub fn category(&self) -> Category {
        Category::from_provider(&self.provider)
    }

    /// Look up a payload field by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.payload
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Common attributes shared by every rendered event, without the
    /// surrounding `<Event` / `/>` markers.
    pub(crate) fn render_header(&self, event_name: &str) -> String {
        format!(
            "MSec=\"{}\" PID=\"{}\" TID=\"{}\" EventName=\"{}\"",
            format_msec(self.timestamp_ns),
            self.process_id,
            self.thread_id,
            escape_attr(event_name),
        )
    }
}

/// Name/render contract shared by generic and specialized events
pub trait DecodedEvent {
    /// Qualified event name, the string name filters are matched against
    fn name(&self) -> Cow<'_, str>;

    /// Human-readable dump of every field. May span several lines.
    fn render(&self) -> String;
}

impl DecodedEvent for TraceEvent {
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}/{}", self.provider, self.event_name))
    }

    fn render(&self) -> String {
        let mut out = format!(
            "<Event {} ProviderName=\"{}\" ID=\"{}\"",
            self.render_header(&self.event_name),
            escape_attr(&self.provider),
            self.event_id,
        );
        for field in &self.payload {
            let _ = write!(
                out,
                " {}=\"{}\"",
                field.name,
                escape_attr(&field.value.to_string())
            );
        }
        out.push_str("/>");
        out
    }
}

/// Escape a string for use inside a double-quoted attribute
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gc_start() -> TraceEvent {
        TraceEvent {
            timestamp_ns: 1_234_567,
            process_id: 4242,
            thread_id: 7,
            provider: RUNTIME_PROVIDER.to_string(),
            event_id: 1,
            event_name: "GC/Start".to_string(),
            payload: vec![
                Field::new("Count", FieldValue::UInt(3)),
                Field::new("Reason", FieldValue::Str("AllocSmall".to_string())),
            ],
        }
    }

    #[test]
    fn test_category_from_provider() {
        assert_eq!(Category::from_provider(RUNTIME_PROVIDER), Category::Runtime);
        assert_eq!(Category::from_provider(RUNDOWN_PROVIDER), Category::Rundown);
        assert_eq!(
            Category::from_provider(SAMPLE_PROFILER_PROVIDER),
            Category::SampleProfiler
        );
        assert_eq!(Category::from_provider("SampleProfiler"), Category::SampleProfiler);
        assert_eq!(Category::from_provider("My-Company-Provider"), Category::Other);
    }

    #[test]
    fn test_name_is_qualified() {
        assert_eq!(gc_start().name(), "Microsoft-Windows-DotNETRuntime/GC/Start");
    }

    #[test]
    fn test_render() {
        assert_eq!(
            gc_start().render(),
            "<Event MSec=\"1.2346\" PID=\"4242\" TID=\"7\" EventName=\"GC/Start\" \
             ProviderName=\"Microsoft-Windows-DotNETRuntime\" ID=\"1\" Count=\"3\" Reason=\"AllocSmall\"/>"
        );
    }

    #[test]
    fn test_render_escapes_values() {
        let mut event = gc_start();
        event.payload = vec![Field::new(
            "TypeName",
            FieldValue::Str("List<\"T\"> & co".to_string()),
        )];
        assert!(event
            .render()
            .contains("TypeName=\"List&lt;&quot;T&quot;&gt; &amp; co\""));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Address(0xdead).to_string(), "0xdead");
        assert_eq!(
            FieldValue::Addresses(vec![0x10, 0x20]).to_string(),
            "0x10,0x20"
        );
        assert_eq!(FieldValue::Bool(true).to_string(), "True");
        assert_eq!(FieldValue::Int(-5).to_string(), "-5");
    }

    #[test]
    fn test_field_lookup() {
        let event = gc_start();
        assert_eq!(event.field("Count"), Some(&FieldValue::UInt(3)));
        assert!(event.field("Missing").is_none());
    }
}
