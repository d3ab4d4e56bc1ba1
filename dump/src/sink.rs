//! Text output
//!
//! Renders events as text blocks on a buffered writer. One block per matched
//! event; a block may span several lines when the event's render does.

use std::io::{BufWriter, Write};

use trace2txt_shared::{DecodedEvent, TraceEvent};

use crate::filter::NameFilter;

/// Buffered text sink shared by all handlers of a run
#[derive(Debug)]
pub struct TextSink<W: Write> {
    out: BufWriter<W>,
    written: u64,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            written: 0,
        }
    }

    /// Blocks written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_block(&mut self, args: std::fmt::Arguments<'_>) -> std::io::Result<()> {
        writeln!(self.out, "{}", args)?;
        self.written += 1;
        Ok(())
    }

    /// Generic path: the event's render, if its name passes the filter
    pub fn generic(&mut self, filter: &NameFilter, event: &TraceEvent) -> anyhow::Result<()> {
        if filter.matches(event) {
            self.write_block(format_args!("{}", event.render()))?;
        }
        Ok(())
    }

    /// Specialized path: `<label>: <render>`, if the name passes the filter
    pub fn specialized<E: DecodedEvent + ?Sized>(
        &mut self,
        filter: &NameFilter,
        label: &str,
        event: &E,
    ) -> anyhow::Result<()> {
        if filter.matches(event) {
            self.write_block(format_args!("{}: {}", label, event.render()))?;
        }
        Ok(())
    }

    /// Unhandled path. Not filtered: an unclaimed event is a diagnostic.
    pub fn unhandled(&mut self, event: &TraceEvent) -> anyhow::Result<()> {
        self.write_block(format_args!("WARNING: unhandled event {}", event.render()))?;
        Ok(())
    }

    /// Flush buffered output and hand back the writer
    pub fn finish(self) -> anyhow::Result<W> {
        self.out
            .into_inner()
            .map_err(|e| anyhow::Error::new(e.into_error()).context("Failed to flush output"))
    }
}
