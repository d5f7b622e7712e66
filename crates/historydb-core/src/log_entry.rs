//! Log Entry Framing
//!
//! A user's daily log object is a concatenation of framed entries:
//!
//! ```text
//! ┌────────────────┬───────────────┬──────────────┐
//! │ time (varint)  │ len (varint)  │ data (len B) │  ... next entry
//! └────────────────┴───────────────┴──────────────┘
//! ```
//!
//! Appends add one frame to the end of the object, so entries are read back in
//! append order. The frame carries the caller-supplied timestamp, which lets
//! readers filter inside a bucket without any side index.

use crate::error::{Error, Result};
use crate::varint::{encode_varint_u64, try_decode_varint_u64, varint_len};
use bytes::{Buf, Bytes, BytesMut};

/// One appended log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: u64,
    pub data: Bytes,
}

impl LogEntry {
    pub fn new(time: u64, data: impl Into<Bytes>) -> Self {
        Self {
            time,
            data: data.into(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        varint_len(self.time) + varint_len(self.data.len() as u64) + self.data.len()
    }

    /// Frame this entry for appending to a daily log object.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        encode_varint_u64(&mut buf, self.time);
        encode_varint_u64(&mut buf, self.data.len() as u64);
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }
}

/// Iterates the frames of one daily log object.
///
/// Yields `Err(TruncatedLogEntry)` once and then stops when the object ends in
/// the middle of a frame.
pub struct LogEntryIter {
    data: Bytes,
    offset: usize,
    failed: bool,
}

impl LogEntryIter {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    fn next_entry(&mut self) -> Result<LogEntry> {
        let start = self.offset;
        let mut cursor = &self.data[start..];
        let before = cursor.remaining();

        let time = try_decode_varint_u64(&mut cursor).ok_or(Error::TruncatedLogEntry(start))?;
        let len = try_decode_varint_u64(&mut cursor).ok_or(Error::TruncatedLogEntry(start))?;
        let len = usize::try_from(len).map_err(|_| Error::TruncatedLogEntry(start))?;
        if cursor.remaining() < len {
            return Err(Error::TruncatedLogEntry(start));
        }

        let header = before - cursor.remaining();
        let body = start + header;
        let data = self.data.slice(body..body + len);
        self.offset = body + len;
        Ok(LogEntry { time, data })
    }
}

impl Iterator for LogEntryIter {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        match self.next_entry() {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode every frame of a daily log object.
pub fn decode_entries(data: Bytes) -> Result<Vec<LogEntry>> {
    LogEntryIter::new(data).collect()
}

/// Concatenate the payloads of every frame in append order.
pub fn concat_payloads(data: Bytes) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(data.len());
    for entry in LogEntryIter::new(data) {
        out.extend_from_slice(&entry?.data);
    }
    Ok(out.freeze())
}
