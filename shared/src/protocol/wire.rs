//! Reader and writer for the `.trace` container.
//!
//! Uses bincode with an explicit config so the writer and the reader always
//! agree on the encoding (fixint for lengths and enum tags).
//!
//! # Layout
//!
//! | Size | Field                                    |
//! |------|------------------------------------------|
//! | 8    | Magic (`TRC2TXT\0`)                      |
//! | 4    | Header length (u32 LE)                   |
//! | N    | [`TraceHeader`] (bincode)                |
//! | 4    | Record length (u32 LE), repeated         |
//! | N    | [`TraceEvent`] (bincode), repeated       |
//!
//! A clean end of file at a record boundary terminates the stream.

use std::io::{Read, Write};

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::types::events::{Pid, TraceEvent};

/// File magic
pub const MAGIC: &[u8; 8] = b"TRC2TXT\0";

/// Container format version
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on a single record, guards against corrupt length prefixes
pub const MAX_RECORD_LEN: u32 = 16 * 1024 * 1024;

/// Single bincode config for the container: fixint encoding so vec lengths and
/// enum tags have a fixed size.
fn wire_bincode() -> impl Options {
    bincode::config::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Errors reading or writing a trace container
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error on trace data")]
    Io(#[from] std::io::Error),

    #[error("not a trace file (bad magic)")]
    BadMagic,

    #[error("unsupported trace format version {0} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion(u32),

    #[error("unexpected end of trace data")]
    UnexpectedEof,

    #[error("record of {0} bytes exceeds the {} byte limit", MAX_RECORD_LEN)]
    RecordTooLarge(u32),

    #[error("failed to decode record")]
    Decode(#[source] bincode::Error),

    #[error("failed to encode record")]
    Encode(#[source] bincode::Error),
}

/// Session-level information stored ahead of the events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceHeader {
    pub version: u32,

    /// Events the session dropped before they reached the file
    pub lost_events: u64,

    /// Traced process
    pub process_id: Pid,

    pub process_name: String,
}

impl TraceHeader {
    /// Header for the current format version
    pub fn new(process_id: Pid, process_name: impl Into<String>) -> Self {
        Self {
            version: FORMAT_VERSION,
            lost_events: 0,
            process_id,
            process_name: process_name.into(),
        }
    }

    pub fn with_lost_events(mut self, lost_events: u64) -> Self {
        self.lost_events = lost_events;
        self
    }
}

/// Read a length prefix. `Ok(None)` on a clean EOF before the first byte.
fn read_len(reader: &mut impl Read) -> Result<Option<u32>, WireError> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(WireError::UnexpectedEof),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(Some(u32::from_le_bytes(buf)))
}

/// Read one length-prefixed record body.
fn read_record(reader: &mut impl Read) -> Result<Option<Vec<u8>>, WireError> {
    let Some(len) = read_len(reader)? else {
        return Ok(None);
    };
    if len > MAX_RECORD_LEN {
        return Err(WireError::RecordTooLarge(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => WireError::UnexpectedEof,
        _ => WireError::Io(e),
    })?;
    Ok(Some(body))
}

fn write_record<T: Serialize>(writer: &mut impl Write, value: &T) -> Result<(), WireError> {
    let bytes = wire_bincode().serialize(value).map_err(WireError::Encode)?;
    let len = u32::try_from(bytes.len())
        .ok()
        .filter(|len| *len <= MAX_RECORD_LEN)
        .ok_or(WireError::RecordTooLarge(u32::MAX))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Streaming reader over a trace container
#[derive(Debug)]
pub struct TraceReader<R> {
    reader: R,
    header: TraceHeader,
}

impl<R: Read> TraceReader<R> {
    /// Read and validate the magic and header.
    pub fn new(mut reader: R) -> Result<Self, WireError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => WireError::BadMagic,
            _ => WireError::Io(e),
        })?;
        if &magic != MAGIC {
            return Err(WireError::BadMagic);
        }

        let body = read_record(&mut reader)?.ok_or(WireError::UnexpectedEof)?;
        let header: TraceHeader = wire_bincode()
            .deserialize(&body)
            .map_err(WireError::Decode)?;
        if header.version != FORMAT_VERSION {
            return Err(WireError::UnsupportedVersion(header.version));
        }

        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// Next event in file order, `Ok(None)` at end of stream.
    pub fn next_event(&mut self) -> Result<Option<TraceEvent>, WireError> {
        match read_record(&mut self.reader)? {
            Some(body) => wire_bincode()
                .deserialize(&body)
                .map(Some)
                .map_err(WireError::Decode),
            None => Ok(None),
        }
    }
}

/// Writer producing a trace container
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    writer: W,
}

impl<W: Write> TraceWriter<W> {
    /// Write the magic and header.
    pub fn new(mut writer: W, header: &TraceHeader) -> Result<Self, WireError> {
        writer.write_all(MAGIC)?;
        write_record(&mut writer, header)?;
        Ok(Self { writer })
    }

    pub fn write_event(&mut self, event: &TraceEvent) -> Result<(), WireError> {
        write_record(&mut self.writer, event)
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W, WireError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::events::{Field, FieldValue, RUNTIME_PROVIDER};
    use std::io::Cursor;

    fn event(name: &str) -> TraceEvent {
        TraceEvent {
            timestamp_ns: 100,
            process_id: 1,
            thread_id: 2,
            provider: RUNTIME_PROVIDER.to_string(),
            event_id: 9,
            event_name: name.to_string(),
            payload: vec![Field::new("Stack", FieldValue::Addresses(vec![1, 2, 3]))],
        }
    }

    fn container(lost: u64, events: &[TraceEvent]) -> Vec<u8> {
        let header = TraceHeader::new(1, "app").with_lost_events(lost);
        let mut writer = TraceWriter::new(Vec::new(), &header).unwrap();
        for e in events {
            writer.write_event(e).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_reads_events_in_order() -> anyhow::Result<()> {
        let bytes = container(3, &[event("A"), event("B")]);
        let mut reader = TraceReader::new(Cursor::new(bytes))?;
        assert_eq!(reader.header().lost_events, 3);
        assert_eq!(reader.header().process_name, "app");
        assert_eq!(reader.next_event()?.unwrap().event_name, "A");
        assert_eq!(reader.next_event()?.unwrap(), event("B"));
        assert!(reader.next_event()?.is_none());
        Ok(())
    }

    #[test]
    fn test_bad_magic() {
        let err = TraceReader::new(Cursor::new(b"NOTATRACEFILE".to_vec())).unwrap_err();
        assert!(matches!(err, WireError::BadMagic));

        let err = TraceReader::new(Cursor::new(b"TRC".to_vec())).unwrap_err();
        assert!(matches!(err, WireError::BadMagic));
    }

    #[test]
    fn test_unsupported_version() {
        let mut header = TraceHeader::new(1, "app");
        header.version = 7;
        let bytes = TraceWriter::new(Vec::new(), &header)
            .unwrap()
            .finish()
            .unwrap();
        let err = TraceReader::new(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, WireError::UnsupportedVersion(7)));
    }

    #[test]
    fn test_truncated_record() {
        let mut bytes = container(0, &[event("A")]);
        bytes.truncate(bytes.len() - 3);
        let mut reader = TraceReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(reader.next_event(), Err(WireError::UnexpectedEof)));
    }

    #[test]
    fn test_decode_error_keeps_cause_in_source() {
        let mut bytes = container(0, &[]);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xff]);
        let mut reader = TraceReader::new(Cursor::new(bytes)).unwrap();
        let err = reader.next_event().unwrap_err();
        assert_eq!(err.to_string(), "failed to decode record");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches("failed to decode record").count(), 1);
        assert!(chain.len() > "failed to decode record".len());
    }

    #[test]
    fn test_truncated_length_prefix() {
        let mut bytes = container(0, &[]);
        bytes.extend_from_slice(&[1, 0]);
        let mut reader = TraceReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(reader.next_event(), Err(WireError::UnexpectedEof)));
    }

    #[test]
    fn test_oversized_record_rejected() {
        let mut bytes = container(0, &[]);
        bytes.extend_from_slice(&(MAX_RECORD_LEN + 1).to_le_bytes());
        let mut reader = TraceReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            reader.next_event(),
            Err(WireError::RecordTooLarge(len)) if len == MAX_RECORD_LEN + 1
        ));
    }
}
