//! Sample-profiler records
//!
//! The sample profiler emits two event kinds that carry more structure than a
//! generic event: a per-thread sample marker and the stack walk captured for
//! it. These views borrow the underlying [`TraceEvent`] and decode the
//! kind-specific fields.

use std::borrow::Cow;
use std::fmt::Write as _;

use super::events::{Category, DecodedEvent, FieldValue, TraceEvent};

/// Event name of a thread sample
pub const THREAD_SAMPLE: &str = "ThreadSample";

/// Event name of a thread stack walk
pub const THREAD_STACK_WALK: &str = "ThreadStackWalk";

/// Errors decoding a sample-profiler record
#[derive(Debug, thiserror::Error)]
pub enum SpecializedError {
    #[error("{event}: missing field {field}")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("{event}: field {field} has unexpected type (expected {expected})")]
    UnexpectedType {
        event: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

/// Sample-profiler sub-kinds with a dedicated decoded shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    ThreadSample,
    ThreadStackWalk,
}

impl SampleKind {
    /// Identify the sub-kind of an event, if it is one
    pub fn of(event: &TraceEvent) -> Option<Self> {
        if event.category() != Category::SampleProfiler {
            return None;
        }
        match event.event_name.as_str() {
            THREAD_SAMPLE => Some(SampleKind::ThreadSample),
            THREAD_STACK_WALK => Some(SampleKind::ThreadStackWalk),
            _ => None,
        }
    }

    /// Label used when printing this sub-kind
    pub fn label(self) -> &'static str {
        match self {
            SampleKind::ThreadSample => THREAD_SAMPLE,
            SampleKind::ThreadStackWalk => THREAD_STACK_WALK,
        }
    }
}

/// What the sampled thread was doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Error,
    External,
    Managed,
    Unknown(u64),
}

impl From<u64> for SampleType {
    fn from(raw: u64) -> Self {
        match raw {
            0 => SampleType::Error,
            1 => SampleType::External,
            2 => SampleType::Managed,
            n => SampleType::Unknown(n),
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleType::Error => f.write_str("Error"),
            SampleType::External => f.write_str("External"),
            SampleType::Managed => f.write_str("Managed"),
            SampleType::Unknown(n) => write!(f, "{}", n),
        }
    }
}

/// A `ThreadSample` event
#[derive(Debug, Clone)]
pub struct ThreadSample<'a> {
    pub event: &'a TraceEvent,
    pub sample_type: SampleType,
}

impl<'a> ThreadSample<'a> {
    pub fn decode(event: &'a TraceEvent) -> Result<Self, SpecializedError> {
        let sample_type = match event.field("Type") {
            Some(FieldValue::UInt(v)) => SampleType::from(*v),
            Some(FieldValue::Int(v)) if *v >= 0 => SampleType::from(*v as u64),
            Some(_) => {
                return Err(SpecializedError::UnexpectedType {
                    event: THREAD_SAMPLE,
                    field: "Type",
                    expected: "unsigned integer",
                })
            }
            None => {
                return Err(SpecializedError::MissingField {
                    event: THREAD_SAMPLE,
                    field: "Type",
                })
            }
        };
        Ok(Self { event, sample_type })
    }
}

impl DecodedEvent for ThreadSample<'_> {
    fn name(&self) -> Cow<'_, str> {
        self.event.name()
    }

    fn render(&self) -> String {
        format!(
            "<Event {} Type=\"{}\"/>",
            self.event.render_header(THREAD_SAMPLE),
            self.sample_type
        )
    }
}

/// A `ThreadStackWalk` event
#[derive(Debug, Clone)]
pub struct ThreadStackWalk<'a> {
    pub event: &'a TraceEvent,

    /// Return addresses, innermost frame first
    pub stack: &'a [u64],
}

impl<'a> ThreadStackWalk<'a> {
    pub fn decode(event: &'a TraceEvent) -> Result<Self, SpecializedError> {
        match event.field("Stack") {
            Some(FieldValue::Addresses(stack)) => Ok(Self {
                event,
                stack: stack.as_slice(),
            }),
            Some(_) => Err(SpecializedError::UnexpectedType {
                event: THREAD_STACK_WALK,
                field: "Stack",
                expected: "address list",
            }),
            None => Err(SpecializedError::MissingField {
                event: THREAD_STACK_WALK,
                field: "Stack",
            }),
        }
    }
}

impl DecodedEvent for ThreadStackWalk<'_> {
    fn name(&self) -> Cow<'_, str> {
        self.event.name()
    }

    fn render(&self) -> String {
        let header = self.event.render_header(THREAD_STACK_WALK);
        if self.stack.is_empty() {
            return format!("<Event {} FrameCount=\"0\"/>", header);
        }
        let mut out = format!("<Event {} FrameCount=\"{}\">", header, self.stack.len());
        for addr in self.stack {
            let _ = write!(out, "\n  <Frame Address=\"0x{:x}\"/>", addr);
        }
        out.push_str("\n</Event>");
        out
    }
}
