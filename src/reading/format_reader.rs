//! `FormatStreamReader`: a lazy, forward-only, restartable sequence of
//! decoded records from one object.
//!
//! Implementations are pluggable over record-format variants; the core only
//! depends on this trait (`SPEC_FULL.md` §4.4, §9 "Polymorphic readers").
//! Avro/Parquet decoders are out of scope — this module implements the
//! minimal bytes/text/JSON variants.

use crate::model::PathLocation;
use crate::storage::StorageError;
use bytes::Bytes;

/// One record decoded from an object, before partition labeling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

/// A lazy, forward-only sequence over one object's decoded records.
///
/// `next` is undefined (implementations may panic) if called when
/// `has_next` is false — callers must check first, matching `spec.md` §4.4.
pub trait FormatStreamReader: Send {
    fn has_next(&self) -> bool;
    fn next(&mut self) -> Result<DecodedRecord, StorageError>;
    /// 0-based index of the record most recently returned; -1 before first.
    fn current_line(&self) -> i64;
    fn location(&self) -> &PathLocation;
    fn close(&mut self);
}

/// Splits the object body on `\n` (stripping a trailing `\r`) and treats
/// each line as one record's raw value with no key. Used for both the
/// `bytes` and `text` decoder variants described in `spec.md` §1.
pub struct LineFormatReader {
    location: PathLocation,
    lines: Vec<Vec<u8>>,
    current_line: i64,
    validate_json: bool,
}

impl LineFormatReader {
    /// `start_at_line` is the last committed line (i.e. resumption begins
    /// at `start_at_line + 1`), or `-1` to start from the beginning.
    pub fn new(location: PathLocation, body: Bytes, start_at_line: i64) -> Self {
        Self::with_validation(location, body, start_at_line, false)
    }

    /// A JSON-lines variant: each line is parsed to confirm it is valid
    /// JSON before being surfaced; a malformed line surfaces
    /// `StorageError::Malformed` but still advances past it, so one bad
    /// record does not wedge the partition forever (see `DESIGN.md`).
    pub fn json_lines(location: PathLocation, body: Bytes, start_at_line: i64) -> Self {
        Self::with_validation(location, body, start_at_line, true)
    }

    fn with_validation(location: PathLocation, body: Bytes, start_at_line: i64, validate_json: bool) -> Self {
        let lines = body
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
            .collect::<Vec<_>>();
        // A trailing newline produces one spurious empty final line.
        let lines = match lines.as_slice() {
            [.., last] if last.is_empty() && !body.is_empty() => lines[..lines.len() - 1].to_vec(),
            _ => lines,
        };

        Self {
            location,
            lines,
            current_line: start_at_line,
            validate_json,
        }
    }
}

impl FormatStreamReader for LineFormatReader {
    fn has_next(&self) -> bool {
        self.current_line + 1 < self.lines.len() as i64
    }

    fn next(&mut self) -> Result<DecodedRecord, StorageError> {
        let idx = (self.current_line + 1) as usize;
        let line = &self.lines[idx];
        self.current_line = idx as i64;

        if self.validate_json {
            if let Err(e) = serde_json::from_slice::<serde_json::Value>(line) {
                return Err(StorageError::Malformed {
                    path: self.location.clone(),
                    line: idx as i64,
                    reason: e.to_string(),
                });
            }
        }

        Ok(DecodedRecord {
            key: None,
            value: line.clone(),
        })
    }

    fn current_line(&self) -> i64 {
        self.current_line
    }

    fn location(&self) -> &PathLocation {
        &self.location
    }

    fn close(&mut self) {}
}
