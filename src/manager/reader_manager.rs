//! Per-partition reader state machine (`SPEC_FULL.md` §4.6): owns at most
//! one open [`FormatStreamReader`] at a time and tracks the last-committed
//! object boundary so it can find the next key to open.

use crate::model::{PathLocation, PathWithLine, PollBatch};
use crate::partition::PartitionExtractor;
use crate::reading::{FormatStreamReader, LineFormatReader, ResultReader};
use crate::storage::{StorageCapability, StorageError};
use std::sync::Arc;
use tracing::debug;

/// Which built-in [`FormatStreamReader`] a manager opens for each object.
/// Avro/Parquet are out of scope; see `spec.md` §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Bytes,
    Json,
}

impl FormatKind {
    fn open(self, location: PathLocation, body: bytes::Bytes, start_at_line: i64) -> Box<dyn FormatStreamReader> {
        match self {
            FormatKind::Bytes => Box::new(LineFormatReader::new(location, body, start_at_line)),
            FormatKind::Json => Box::new(LineFormatReader::json_lines(location, body, start_at_line)),
        }
    }
}

/// One manager's poll result: the batch collected (if any) and the first
/// decode error encountered while collecting it (if any), mirroring
/// [`crate::reading::RetrievedBatch`] at the manager boundary. The two are
/// independent — a decode error never costs the caller the good records
/// read before it.
#[derive(Debug)]
pub struct ManagerPollOutcome {
    pub batch: Option<PollBatch>,
    pub error: Option<StorageError>,
}

enum ManagerState {
    Idle,
    Reading {
        reader: Box<dyn FormatStreamReader>,
        current_key: String,
    },
    Closed,
}

/// Owns the read position for one `(root, partition)` pair.
pub struct ReaderManager {
    bucket: String,
    partition_prefix: String,
    target_topic: String,
    format: FormatKind,
    storage: Arc<dyn StorageCapability>,
    partition_extractor: Arc<PartitionExtractor>,
    state: ManagerState,
    /// The key+line of the most recently fully-read object, used to find
    /// the next key strictly exceeding it while Idle.
    last_committed: Option<PathWithLine>,
}

impl ReaderManager {
    /// `resume_from` is the host's `contextOffsetFn(root)` result, consulted
    /// once at construction; if present the Manager begins reading that
    /// exact `(key, line)` rather than searching for the next key. Opening
    /// the object body eagerly here (rather than lazily on first `poll`)
    /// keeps `poll` the only place that awaits I/O errors.
    pub async fn new(
        bucket: impl Into<String>,
        partition_prefix: impl Into<String>,
        target_topic: impl Into<String>,
        format: FormatKind,
        storage: Arc<dyn StorageCapability>,
        partition_extractor: Arc<PartitionExtractor>,
        resume_from: Option<PathWithLine>,
    ) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        let partition_prefix = partition_prefix.into();
        let target_topic = target_topic.into();

        let (state, last_committed) = match resume_from {
            None => (ManagerState::Idle, None),
            Some(offset) => {
                let location = offset.path.clone();
                let body = storage.get(&location).await?;
                let reader = format.open(location, body, offset.line);
                (
                    ManagerState::Reading {
                        reader,
                        current_key: offset.path.key.clone(),
                    },
                    Some(offset),
                )
            }
        };

        Ok(Self {
            bucket,
            partition_prefix,
            target_topic,
            format,
            storage,
            partition_extractor,
            state,
            last_committed,
        })
    }

    pub fn partition_prefix(&self) -> &str {
        &self.partition_prefix
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ManagerState::Closed)
    }

    /// Terminal: no further reads are attempted, `poll` returns empty.
    pub fn close(&mut self) {
        if let ManagerState::Reading { reader, .. } = &mut self.state {
            reader.close();
        }
        self.state = ManagerState::Closed;
    }

    /// Advances the state machine and returns at most `limit` records.
    ///
    /// On a `StorageError` opening the next object, the Manager remains in
    /// its pre-failure state so the next call to `poll` retries — per
    /// `spec.md` §4.6. A decode error reaching *within* an already-open
    /// object is reported via [`ManagerPollOutcome::error`] instead, since
    /// the reader itself is fine and any records collected before the bad
    /// one must still reach the caller.
    pub async fn poll(&mut self, limit: usize) -> Result<ManagerPollOutcome, StorageError> {
        match &self.state {
            ManagerState::Closed => return Ok(ManagerPollOutcome { batch: None, error: None }),
            ManagerState::Idle => {
                if !self.open_next().await? {
                    return Ok(ManagerPollOutcome { batch: None, error: None });
                }
            }
            ManagerState::Reading { .. } => {}
        }

        let ManagerState::Reading { reader, current_key } = &mut self.state else {
            unreachable!("Idle transitions to Reading or returns above");
        };

        let retrieved = {
            let mut result_reader = ResultReader::new(reader.as_mut(), self.target_topic.clone(), &self.partition_extractor);
            result_reader.retrieve_results(limit)
        };

        if !reader.has_next() {
            let finished_key = current_key.clone();
            let finished_line = reader.current_line();
            reader.close();
            debug!(partition = %self.partition_prefix, key = %finished_key, line = finished_line, "reader exhausted object, returning to idle");
            self.last_committed = Some(PathWithLine::new(PathLocation::new(&self.bucket, finished_key), finished_line));
            self.state = ManagerState::Idle;
        }

        Ok(ManagerPollOutcome {
            batch: retrieved.batch,
            error: retrieved.error,
        })
    }

    /// Looks up the next object strictly exceeding the last-committed key
    /// under this partition and, if found, opens a fresh reader for it.
    /// Returns `false` if no such object currently exists.
    async fn open_next(&mut self) -> Result<bool, StorageError> {
        let after_key = self.last_committed.as_ref().map(|c| c.path.key.as_str());
        let page = self
            .storage
            .list(&self.bucket, &self.partition_prefix, after_key, 1)
            .await?;

        let Some(key) = page.keys.into_iter().next() else {
            return Ok(false);
        };

        let location = PathLocation::new(&self.bucket, key.clone());
        let body = self.storage.get(&location).await?;
        let reader = self.format.open(location, body, -1);

        self.state = ManagerState::Reading {
            reader,
            current_key: key,
        };
        Ok(true)
    }
}

impl std::fmt::Debug for ReaderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            ManagerState::Idle => "Idle",
            ManagerState::Reading { .. } => "Reading",
            ManagerState::Closed => "Closed",
        };
        f.debug_struct("ReaderManager")
            .field("partition_prefix", &self.partition_prefix)
            .field("state", &state)
            .field("last_committed", &self.last_committed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    async fn manager(storage: Arc<dyn StorageCapability>) -> ReaderManager {
        ReaderManager::new(
            "bucket",
            "prefix1/",
            "my-topic",
            FormatKind::Bytes,
            storage,
            Arc::new(PartitionExtractor::Hierarchical),
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn idle_with_no_objects_returns_empty() {
        let storage: Arc<dyn StorageCapability> = Arc::new(MemoryStorage::new());
        let mut mgr = manager(storage).await;
        let outcome = mgr.poll(10).await.unwrap();
        assert!(outcome.batch.is_none());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn opens_first_object_and_emits_all_lines() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "a\nb\nc");
        let storage: Arc<dyn StorageCapability> = Arc::new(storage);
        let mut mgr = manager(storage).await;

        let outcome = mgr.poll(10).await.unwrap();
        assert!(outcome.error.is_none());
        let batch = outcome.batch.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.target_topic, "my-topic");
        assert_eq!(batch.offset.line, 2);
    }

    #[tokio::test]
    async fn advances_to_next_object_once_current_is_exhausted() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "a\nb");
        storage.put_object("bucket", "prefix1/2.txt", "c\nd");
        let storage: Arc<dyn StorageCapability> = Arc::new(storage);
        let mut mgr = manager(storage).await;

        let first = mgr.poll(2).await.unwrap().batch.unwrap();
        assert_eq!(first.origin.key, "prefix1/1.txt");

        let second = mgr.poll(2).await.unwrap().batch.unwrap();
        assert_eq!(second.origin.key, "prefix1/2.txt");
    }

    /// S6 — reader resumption via the host-supplied context offset.
    #[tokio::test]
    async fn s6_resumes_mid_object_from_context_offset() {
        let storage = MemoryStorage::new();
        let body = (0..10).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        storage.put_object("bucket", "prefix1/a.txt", body);
        let storage: Arc<dyn StorageCapability> = Arc::new(storage);

        let resume = PathWithLine::new(PathLocation::new("bucket", "prefix1/a.txt"), 3);
        let mut mgr = ReaderManager::new(
            "bucket",
            "prefix1/",
            "my-topic",
            FormatKind::Bytes,
            storage,
            Arc::new(PartitionExtractor::Hierarchical),
            Some(resume),
        )
        .await
        .unwrap();

        let batch = mgr.poll(5).await.unwrap().batch.unwrap();
        let values: Vec<String> = batch
            .records
            .iter()
            .map(|r| String::from_utf8(r.value.clone()).unwrap())
            .collect();
        assert_eq!(values, vec!["line4", "line5", "line6", "line7", "line8"]);
    }

    #[tokio::test]
    async fn closed_manager_always_returns_empty() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "a");
        let storage: Arc<dyn StorageCapability> = Arc::new(storage);
        let mut mgr = manager(storage).await;
        mgr.close();
        let outcome = mgr.poll(10).await.unwrap();
        assert!(outcome.batch.is_none());
        assert!(mgr.is_closed());
    }

    #[tokio::test]
    async fn malformed_record_surfaces_and_manager_stays_in_reading() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "not json\n{\"ok\":true}");
        let storage: Arc<dyn StorageCapability> = Arc::new(storage);
        let mut mgr = ReaderManager::new(
            "bucket",
            "prefix1/",
            "my-topic",
            FormatKind::Json,
            storage,
            Arc::new(PartitionExtractor::Hierarchical),
            None,
        )
        .await
        .unwrap();

        let outcome = mgr.poll(10).await.unwrap();
        assert!(outcome.batch.is_none());
        let err = outcome.error.unwrap();
        assert!(matches!(err, StorageError::Malformed { .. }));

        // The bad line was skipped; the next poll reaches the valid one.
        let batch = mgr.poll(10).await.unwrap().batch.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn malformed_record_after_good_records_keeps_the_good_batch() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "{\"a\":1}\nnot json\n{\"b\":2}");
        let storage: Arc<dyn StorageCapability> = Arc::new(storage);
        let mut mgr = ReaderManager::new(
            "bucket",
            "prefix1/",
            "my-topic",
            FormatKind::Json,
            storage,
            Arc::new(PartitionExtractor::Hierarchical),
            None,
        )
        .await
        .unwrap();

        let outcome = mgr.poll(10).await.unwrap();
        let batch = outcome.batch.expect("the good record before the bad one must not be dropped");
        assert_eq!(batch.len(), 1);
        assert!(matches!(outcome.error, Some(StorageError::Malformed { .. })));

        let second = mgr.poll(10).await.unwrap();
        let batch2 = second.batch.unwrap();
        assert_eq!(batch2.len(), 1);
        assert!(second.error.is_none());
    }
}
