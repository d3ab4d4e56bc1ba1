//! Write a small `.trace` file for trying out the dumper.
//!
//! cargo run -p trace2txt-dump --example write_demo_trace -- demo.trace
//! cargo run -p trace2txt-cli -- demo.trace

use std::fs::File;

use anyhow::{Context, Result};
use trace2txt_shared::protocol::wire::{TraceHeader, TraceWriter};
use trace2txt_shared::{
    Field, FieldValue, TraceEvent, RUNDOWN_PROVIDER, RUNTIME_PROVIDER, SAMPLE_PROFILER_PROVIDER,
};

fn event(ts_us: u64, provider: &str, id: u16, name: &str, payload: Vec<Field>) -> TraceEvent {
    TraceEvent {
        timestamp_ns: ts_us * 1_000,
        process_id: 4242,
        thread_id: 1,
        provider: provider.to_string(),
        event_id: id,
        event_name: name.to_string(),
        payload,
    }
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo.trace".to_string());

    let events = vec![
        event(
            10,
            RUNTIME_PROVIDER,
            1,
            "GC/Start",
            vec![
                Field::new("Count", FieldValue::UInt(1)),
                Field::new("Reason", FieldValue::Str("AllocSmall".to_string())),
            ],
        ),
        event(
            20,
            SAMPLE_PROFILER_PROVIDER,
            0,
            "ThreadSample",
            vec![Field::new("Type", FieldValue::UInt(2))],
        ),
        event(
            20,
            SAMPLE_PROFILER_PROVIDER,
            1,
            "ThreadStackWalk",
            vec![Field::new(
                "Stack",
                FieldValue::Addresses(vec![0x7ffd_1000, 0x7ffd_2040, 0x7ffd_3080]),
            )],
        ),
        event(30, RUNTIME_PROVIDER, 2, "GC/Stop", vec![]),
        event(
            40,
            RUNDOWN_PROVIDER,
            144,
            "Method/DCEndVerbose",
            vec![
                Field::new("MethodStartAddress", FieldValue::Address(0x7ffd_1000)),
                Field::new("MethodName", FieldValue::Str("Main".to_string())),
            ],
        ),
    ];

    let file = File::create(&path).with_context(|| format!("Failed to create {}", path))?;
    let mut writer = TraceWriter::new(file, &TraceHeader::new(4242, "demo"))?;
    for e in &events {
        writer.write_event(e)?;
    }
    writer.finish()?;

    println!("Wrote {} events to {}", events.len(), path);
    Ok(())
}
