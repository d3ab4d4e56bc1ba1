//! Subscription topologies
//!
//! Wires the handlers of [`TextSink`] onto an [`EventSource`] for the chosen
//! [`Mode`]. Every closure captures the run's [`NameFilter`] by reference.
//!
//! In [`Mode::DumpAll`] the catch-all subscription overlaps the category
//! subscriptions, so runtime, rundown and sample-profiler events are printed
//! twice: once by their category and once by the catch-all.

use std::io::Write;

use tracing::debug;
use trace2txt_shared::{Category, SampleKind};

use crate::config::Mode;
use crate::filter::NameFilter;
use crate::sink::TextSink;
use crate::source::EventSource;

/// Register the handlers for `mode`
pub fn subscribe<'h, W: Write>(
    mode: Mode,
    filter: &'h NameFilter,
    source: &mut EventSource<'h, TextSink<W>>,
) {
    debug!(
        "Subscribing for {} (filter: {})",
        mode,
        filter.pattern().unwrap_or("<none>")
    );
    match mode {
        Mode::DumpAll => setup_dump_all(filter, source),
        Mode::DumpSamples => setup_dump_samples(filter, source),
    }
}

/// Runtime, catch-all, rundown and sample-profiler streams, all generic
pub fn setup_dump_all<'h, W: Write>(
    filter: &'h NameFilter,
    source: &mut EventSource<'h, TextSink<W>>,
) {
    source.on_category(Category::Runtime, move |sink, e| sink.generic(filter, e));
    source.on_all_events(move |sink, e| sink.generic(filter, e));
    source.on_category(Category::Rundown, move |sink, e| sink.generic(filter, e));
    source.on_category(Category::SampleProfiler, move |sink, e| {
        sink.generic(filter, e)
    });
}

/// Runtime and rundown generically, decoded samples and stack walks, and a
/// warning for anything left over
pub fn setup_dump_samples<'h, W: Write>(
    filter: &'h NameFilter,
    source: &mut EventSource<'h, TextSink<W>>,
) {
    source.on_category(Category::Runtime, move |sink, e| sink.generic(filter, e));
    source.on_category(Category::Rundown, move |sink, e| sink.generic(filter, e));
    source.on_thread_sample(move |sink, s| {
        sink.specialized(filter, SampleKind::ThreadSample.label(), s)
    });
    source.on_thread_stack_walk(move |sink, w| {
        sink.specialized(filter, SampleKind::ThreadStackWalk.label(), w)
    });
    source.on_unhandled(|sink, e| sink.unhandled(e));
}
