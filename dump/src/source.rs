//! Event source
//!
//! Reads a `.trace` container and pushes each event, in file order, to the
//! handlers registered on it. Registrations are kept in one ordered table:
//! for every event the table is walked front to back and each matching entry
//! fires. Events that no category or sample subscription claims go to the
//! unhandled subscriptions instead.
//!
//! Handlers receive a caller-supplied context (`C`) by mutable reference, so
//! they can share one output sink without interior mutability.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use trace2txt_shared::protocol::wire::{TraceHeader, TraceReader, WireError};
use trace2txt_shared::{
    Category, SampleKind, SpecializedError, ThreadSample, ThreadStackWalk, TraceEvent,
};

/// Handler for generic events
pub type EventHandler<'h, C> = Box<dyn Fn(&mut C, &TraceEvent) -> anyhow::Result<()> + 'h>;

/// Handler for decoded thread samples
pub type ThreadSampleHandler<'h, C> =
    Box<dyn Fn(&mut C, &ThreadSample<'_>) -> anyhow::Result<()> + 'h>;

/// Handler for decoded stack walks
pub type StackWalkHandler<'h, C> =
    Box<dyn Fn(&mut C, &ThreadStackWalk<'_>) -> anyhow::Result<()> + 'h>;

/// Errors raised while opening or processing a trace
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open trace file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed trace")]
    Wire(#[from] WireError),

    #[error("malformed sample-profiler event")]
    Specialized(#[from] SpecializedError),

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

enum Registration<'h, C> {
    Category(Category, EventHandler<'h, C>),
    AllEvents(EventHandler<'h, C>),
    ThreadSample(ThreadSampleHandler<'h, C>),
    ThreadStackWalk(StackWalkHandler<'h, C>),
    Unhandled(EventHandler<'h, C>),
}

/// Counters reported after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Events read from the trace
    pub events: u64,

    /// Handler invocations, unhandled ones included
    pub deliveries: u64,

    /// Events no category or sample subscription claimed
    pub unhandled: u64,
}

/// A trace opened for processing
pub struct EventSource<'h, C> {
    path: PathBuf,
    reader: TraceReader<BufReader<File>>,
    registrations: Vec<Registration<'h, C>>,
}

impl<'h, C> EventSource<'h, C> {
    /// Open a trace file and read its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
        let reader = TraceReader::new(BufReader::new(file))?;

        let header = reader.header();
        debug!(
            "Opened {} (pid {} {:?}, {} lost events)",
            path.display(),
            header.process_id,
            header.process_name,
            header.lost_events
        );

        Ok(Self {
            path,
            reader,
            registrations: Vec::new(),
        })
    }

    pub fn header(&self) -> &TraceHeader {
        self.reader.header()
    }

    /// Events the session dropped before they reached the file
    pub fn events_lost(&self) -> u64 {
        self.header().lost_events
    }

    /// Every event of a provider category
    pub fn on_category<F>(&mut self, category: Category, handler: F)
    where
        F: Fn(&mut C, &TraceEvent) -> anyhow::Result<()> + 'h,
    {
        self.registrations
            .push(Registration::Category(category, Box::new(handler)));
    }

    /// Every event, regardless of any other subscription
    pub fn on_all_events<F>(&mut self, handler: F)
    where
        F: Fn(&mut C, &TraceEvent) -> anyhow::Result<()> + 'h,
    {
        self.registrations
            .push(Registration::AllEvents(Box::new(handler)));
    }

    /// Decoded `ThreadSample` events.
    ///
    /// The record is decoded before the handler runs, so a malformed sample
    /// fails the run even when the handler's name filter would drop it.
    pub fn on_thread_sample<F>(&mut self, handler: F)
    where
        F: Fn(&mut C, &ThreadSample<'_>) -> anyhow::Result<()> + 'h,
    {
        self.registrations
            .push(Registration::ThreadSample(Box::new(handler)));
    }

    /// Decoded `ThreadStackWalk` events. Decoding happens ahead of the
    /// handler, as for [`Self::on_thread_sample`].
    pub fn on_thread_stack_walk<F>(&mut self, handler: F)
    where
        F: Fn(&mut C, &ThreadStackWalk<'_>) -> anyhow::Result<()> + 'h,
    {
        self.registrations
            .push(Registration::ThreadStackWalk(Box::new(handler)));
    }

    /// Events no category or sample subscription claimed
    pub fn on_unhandled<F>(&mut self, handler: F)
    where
        F: Fn(&mut C, &TraceEvent) -> anyhow::Result<()> + 'h,
    {
        self.registrations
            .push(Registration::Unhandled(Box::new(handler)));
    }

    /// Read the trace to the end, dispatching every event.
    ///
    /// Consumes the source; the file is closed when this returns.
    pub fn process(mut self, ctx: &mut C) -> Result<ProcessStats, SourceError> {
        let mut stats = ProcessStats::default();
        while let Some(event) = self.reader.next_event()? {
            stats.events += 1;
            self.dispatch(ctx, &event, &mut stats)?;
        }

        info!(
            "Processed {}: {} events, {} deliveries, {} unhandled",
            self.path.display(),
            stats.events,
            stats.deliveries,
            stats.unhandled
        );
        Ok(stats)
    }

    fn dispatch(
        &self,
        ctx: &mut C,
        event: &TraceEvent,
        stats: &mut ProcessStats,
    ) -> Result<(), SourceError> {
        let category = event.category();
        let kind = SampleKind::of(event);
        let mut claimed = false;

        for registration in &self.registrations {
            match registration {
                Registration::Category(c, handler) if *c == category => {
                    claimed = true;
                    handler(ctx, event)?;
                }
                Registration::AllEvents(handler) => handler(ctx, event)?,
                Registration::ThreadSample(handler) if kind == Some(SampleKind::ThreadSample) => {
                    claimed = true;
                    handler(ctx, &ThreadSample::decode(event)?)?;
                }
                Registration::ThreadStackWalk(handler)
                    if kind == Some(SampleKind::ThreadStackWalk) =>
                {
                    claimed = true;
                    handler(ctx, &ThreadStackWalk::decode(event)?)?;
                }
                _ => continue,
            }
            stats.deliveries += 1;
        }

        if claimed {
            return Ok(());
        }

        stats.unhandled += 1;
        for registration in &self.registrations {
            if let Registration::Unhandled(handler) = registration {
                handler(ctx, event)?;
                stats.deliveries += 1;
            }
        }
        Ok(())
    }
}

impl<C> std::fmt::Debug for EventSource<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("path", &self.path)
            .field("header", self.reader.header())
            .field("registrations", &self.registrations.len())
            .finish()
    }
}
