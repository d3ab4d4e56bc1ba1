//! Top-level run: open the trace, report lost events, subscribe, process.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::filter::NameFilter;
use crate::router;
use crate::sink::TextSink;
use crate::source::{EventSource, ProcessStats};

/// Dump the trace named by `config` to `out`. Warnings about the trace as a
/// whole (lost events) go to `err`.
pub fn run<W: Write, E: Write>(config: &Config, out: W, err: &mut E) -> Result<ProcessStats> {
    config.validate().context("Invalid configuration")?;

    let filter = NameFilter::new(config.event_pattern.as_deref())?;

    let mut source = EventSource::open(&config.trace_path)
        .with_context(|| format!("Failed to read {}", config.trace_path.display()))?;

    let lost = source.events_lost();
    if lost != 0 {
        debug!("Trace header reports {} lost events", lost);
        writeln!(err, "WARNING: there were {} lost events", lost)?;
    }

    router::subscribe(config.mode, &filter, &mut source);

    let mut sink = TextSink::new(out);
    let stats = source
        .process(&mut sink)
        .with_context(|| format!("Failed to process {}", config.trace_path.display()))?;

    info!("Wrote {} event blocks", sink.written());
    sink.finish()?;

    Ok(stats)
}
