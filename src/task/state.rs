//! The outward-facing `Clean → Open → Closed` task lifecycle
//! (`spec.md` §4.8).

use super::factory::{ContextOffsetFn, TaskManagerFactory};
use crate::clock::SystemClock;
use crate::config::SourceConfig;
use crate::discovery::{DirectoryLister, PartitionSearcher};
use crate::error::SourceError;
use crate::manager::ReaderManagerService;
use crate::model::{PollOutcome, RootLocation};
use crate::storage::s3::S3Storage;
use crate::storage::StorageCapability;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("poll called before start")]
    NotStarted,
    #[error("start called on an already-started task")]
    AlreadyStarted,
}

struct OpenState {
    service: ReaderManagerService,
    block: bool,
    has_discovered_once: bool,
}

enum TaskPhase {
    Clean,
    Open(OpenState),
    Closed,
}

/// A single task instance's view of its assigned roots. The host is
/// responsible for sharding roots across task instances via
/// `crate::partition::assign` before calling `start`.
pub struct SourceTask {
    /// Identifies this instance in logs when several task instances run
    /// side by side (`spec.md` §5's `(taskCount, taskIndex)` sharding).
    task_id: uuid::Uuid,
    phase: TaskPhase,
}

impl Default for SourceTask {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTask {
    pub fn new() -> Self {
        Self {
            task_id: uuid::Uuid::new_v4(),
            phase: TaskPhase::Clean,
        }
    }

    pub fn task_id(&self) -> uuid::Uuid {
        self.task_id
    }

    /// Parses `props`, connects to AWS S3, and builds the discovery and
    /// reading pipeline. Fails with [`StateError::AlreadyStarted`] if called
    /// more than once across the task's lifetime (including after `close`).
    pub async fn start(&mut self, props: &HashMap<String, String>, offset_fn: ContextOffsetFn) -> Result<(), SourceError> {
        let config = SourceConfig::parse(props)?;
        let storage: Arc<dyn StorageCapability> = Arc::new(S3Storage::new(&config.aws).await?);
        self.start_with_storage(config, storage, offset_fn).await
    }

    /// Like [`Self::start`], but against a caller-supplied
    /// [`StorageCapability`] rather than a live S3 connection — used by
    /// tests, the CLI demo, and embedders fronting an S3-compatible store
    /// this crate has no dedicated client for.
    pub async fn start_with_storage(
        &mut self,
        config: SourceConfig,
        storage: Arc<dyn StorageCapability>,
        offset_fn: ContextOffsetFn,
    ) -> Result<(), SourceError> {
        if !matches!(self.phase, TaskPhase::Clean) {
            return Err(StateError::AlreadyStarted.into());
        }

        let roots: Vec<RootLocation> = config.mappings.iter().map(|m| m.source.clone()).collect();
        let topic_by_root: HashMap<RootLocation, String> = config
            .mappings
            .iter()
            .map(|m| (m.source.clone(), m.target_topic.clone()))
            .collect();

        let clock = Arc::new(SystemClock);
        let lister = DirectoryLister::new(storage.clone(), clock.clone(), 1000);
        let searcher = PartitionSearcher::new(lister, clock, config.recurse_levels, config.pause_after_count, config.pause_after);

        let factory = Arc::new(TaskManagerFactory {
            storage,
            partition_extractor: Arc::new(config.partition_extractor),
            topic_by_root,
            offset_fn,
        });

        let service = ReaderManagerService::new(roots, searcher, config.search_interval, factory);

        info!(task_id = %self.task_id, mappings = config.mappings.len(), "source task started");
        self.phase = TaskPhase::Open(OpenState {
            service,
            block: config.block,
            has_discovered_once: false,
        });
        Ok(())
    }

    /// Drives the reading pipeline, returning up to `max_batch_size` records
    /// concatenated across every partition's batch this cycle.
    pub async fn poll(&mut self, max_batch_size: usize) -> Result<PollOutcome, SourceError> {
        let open = match &mut self.phase {
            TaskPhase::Clean => return Err(StateError::NotStarted.into()),
            TaskPhase::Closed => return Ok(PollOutcome::default()),
            TaskPhase::Open(open) => open,
        };

        let managers = if open.block || !open.has_discovered_once {
            open.has_discovered_once = true;
            open.service.get_reader_managers().await?
        } else {
            open.service.current_managers()
        };

        let mut outcome = PollOutcome::default();
        let mut remaining = max_batch_size;

        for manager in managers {
            if remaining == 0 {
                break;
            }
            match manager.poll(remaining).await {
                Ok(result) => {
                    if let Some(batch) = result.batch {
                        remaining = remaining.saturating_sub(batch.len());
                        outcome.batches.push(batch);
                    }
                    if let Some(e) = result.error {
                        warn!(partition = manager.partition_prefix(), error = %e, "partition poll failed, continuing with other partitions");
                        if outcome.error.is_none() {
                            outcome.error = Some(SourceError::Storage(e));
                        }
                    }
                }
                Err(e) => {
                    warn!(partition = manager.partition_prefix(), error = %e, "partition poll failed, continuing with other partitions");
                    if outcome.error.is_none() {
                        outcome.error = Some(SourceError::Storage(e));
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Closes every Reader Manager, then releases the storage handle.
    /// A no-op on an already-closed task; fails if the task never started.
    pub async fn close(&mut self) -> Result<(), SourceError> {
        match &mut self.phase {
            TaskPhase::Clean => return Err(StateError::NotStarted.into()),
            TaskPhase::Closed => return Ok(()),
            TaskPhase::Open(open) => {
                open.service.close_all();
            }
        }
        self.phase = TaskPhase::Closed;
        info!(task_id = %self.task_id, "source task closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, TaskPhase::Open(_))
    }
}
