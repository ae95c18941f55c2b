//! Wraps a [`FormatStreamReader`] with the routing metadata needed to turn
//! decoded records into a [`PollBatch`] (`SPEC_FULL.md` §4.5).

use super::format_reader::FormatStreamReader;
use crate::model::{PathWithLine, PollBatch, SourceData};
use crate::partition::PartitionExtractor;
use crate::storage::StorageError;

pub struct ResultReader<'a> {
    reader: &'a mut dyn FormatStreamReader,
    target_topic: String,
    partition_extractor: &'a PartitionExtractor,
}

/// The outcome of one [`ResultReader::retrieve_results`] call: the batch
/// collected before a decode error (if any) stopped collection, and that
/// error. A decode error never discards records already collected in the
/// same call — both reach the caller so the good records are never lost.
#[derive(Debug)]
pub struct RetrievedBatch {
    pub batch: Option<PollBatch>,
    pub error: Option<StorageError>,
}

impl<'a> ResultReader<'a> {
    pub fn new(
        reader: &'a mut dyn FormatStreamReader,
        target_topic: impl Into<String>,
        partition_extractor: &'a PartitionExtractor,
    ) -> Self {
        Self {
            reader,
            target_topic: target_topic.into(),
            partition_extractor,
        }
    }

    /// Pulls up to `limit` records. `batch` is `None` if the reader was
    /// already exhausted before any record could be read, or if a decode
    /// error struck before any record was collected. Otherwise `batch`
    /// holds every record read before a decode error (if any) stopped
    /// collection, or up to `limit`/exhaustion if none did. `error` carries
    /// that decode error, if one occurred, regardless of whether `batch` is
    /// also present — a bad record is surfaced, not swallowed, but it never
    /// costs the caller the good records read before it.
    pub fn retrieve_results(&mut self, limit: usize) -> RetrievedBatch {
        if !self.reader.has_next() {
            return RetrievedBatch { batch: None, error: None };
        }

        let mut records = Vec::with_capacity(limit.min(64));
        let mut error = None;
        while records.len() < limit && self.reader.has_next() {
            match self.reader.next() {
                Ok(decoded) => {
                    let partition = self.partition_extractor.extract(&self.reader.location().key);
                    records.push(SourceData {
                        partition,
                        key: decoded.key,
                        value: decoded.value,
                    });
                }
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        let batch = if records.is_empty() {
            None
        } else {
            Some(PollBatch {
                records,
                origin: self.reader.location().clone(),
                target_topic: self.target_topic.clone(),
                offset: PathWithLine::new(self.reader.location().clone(), self.reader.current_line()),
            })
        };

        RetrievedBatch { batch, error }
    }
}
