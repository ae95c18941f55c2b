//! Wires the host's `contextOffsetFn` and routing metadata into the
//! [`ManagerFactory`] contract the [`ReaderManagerService`] calls against.

use crate::manager::{FormatKind, ManagerFactory, ReaderManager};
use crate::model::{PathWithLine, RootLocation};
use crate::offset::OffsetKey;
use crate::partition::PartitionExtractor;
use crate::storage::{StorageCapability, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Supplies the last-committed `(key, line)` for a partition, as persisted
/// by the host between task restarts. See `spec.md` §6's offset shape.
pub type ContextOffsetFn = Arc<dyn Fn(&OffsetKey) -> Option<PathWithLine> + Send + Sync>;

pub struct TaskManagerFactory {
    pub storage: Arc<dyn StorageCapability>,
    pub partition_extractor: Arc<PartitionExtractor>,
    pub topic_by_root: HashMap<RootLocation, String>,
    pub offset_fn: ContextOffsetFn,
}

#[async_trait]
impl ManagerFactory for TaskManagerFactory {
    async fn create(&self, root: &RootLocation, partition_prefix: &str) -> Result<ReaderManager, StorageError> {
        let target_topic = self.topic_by_root.get(root).cloned().unwrap_or_else(|| {
            tracing::warn!(bucket = %root.bucket, "no routing mapping found for root, dropping records on the floor");
            String::new()
        });

        let offset_key = OffsetKey {
            container: root.bucket.clone(),
            prefix: partition_prefix.to_string(),
        };
        let resume_from = (self.offset_fn)(&offset_key);

        ReaderManager::new(
            root.bucket.clone(),
            partition_prefix.to_string(),
            target_topic,
            FormatKind::Bytes,
            self.storage.clone(),
            self.partition_extractor.clone(),
            resume_from,
        )
        .await
    }
}
