//! Orchestrates the [`DirectoryLister`] across multiple configured roots,
//! maintaining per-root discovery state across search cycles.

use super::lister::DirectoryLister;
use crate::clock::Clock;
use crate::model::{DirectoryFindConfig, PartitionSearcherResponse, RootLocation};
use crate::storage::StorageError;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub struct PartitionSearcher {
    lister: DirectoryLister,
    clock: Arc<dyn Clock>,
    recurse_levels: u32,
    pause_after_count: usize,
    pause_after: Duration,
}

impl PartitionSearcher {
    pub fn new(
        lister: DirectoryLister,
        clock: Arc<dyn Clock>,
        recurse_levels: u32,
        pause_after_count: usize,
        pause_after: Duration,
    ) -> Self {
        Self {
            lister,
            clock,
            recurse_levels,
            pause_after_count,
            pause_after,
        }
    }

    fn call_config(&self) -> DirectoryFindConfig {
        DirectoryFindConfig {
            recurse_levels: self.recurse_levels,
            max_prefixes_before_pause: Some(self.pause_after_count),
            wall_clock_deadline: if self.pause_after.is_zero() {
                None
            } else {
                Some(self.clock.now() + self.pause_after)
            },
        }
    }

    /// Runs one discovery cycle across every root, producing a fresh
    /// response per root. `previous` holds the prior cycle's responses,
    /// keyed by root; a root absent from `previous` is searched from
    /// scratch (empty exclude set, no continuation).
    pub async fn search(
        &self,
        roots: &[RootLocation],
        previous: &HashMap<RootLocation, PartitionSearcherResponse>,
    ) -> Result<Vec<PartitionSearcherResponse>, StorageError> {
        let mut responses = Vec::with_capacity(roots.len());

        for root in roots {
            let prev = previous.get(root);

            let exclude: HashSet<String> = prev
                .map(|p| p.all_partitions.iter().cloned().collect())
                .unwrap_or_default();
            let continue_from = prev.and_then(|p| p.continue_from());

            let result = self
                .lister
                .find_directories(root, &self.call_config(), &exclude, continue_from.as_ref())
                .await?;

            let mut all_partitions: IndexSet<String> =
                prev.map(|p| p.all_partitions.clone()).unwrap_or_default();
            for prefix in result.prefixes() {
                all_partitions.insert(prefix.clone());
            }

            responses.push(PartitionSearcherResponse {
                root: root.clone(),
                observed_at: chrono::Utc::now(),
                all_partitions,
                last_result: result,
            });
        }

        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::storage::memory::MemoryStorage;
    use std::sync::Arc;

    fn root(bucket: &str) -> RootLocation {
        RootLocation {
            bucket: bucket.to_string(),
            prefix: None,
            allow_slash: true,
        }
    }

    #[tokio::test]
    async fn first_cycle_has_no_exclude_or_continuation() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "a");
        storage.put_object("bucket", "prefix2/2.txt", "b");

        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 1000);
        let searcher = PartitionSearcher::new(lister, Arc::new(TestClock::new()), 0, 1000, Duration::ZERO);

        let responses = searcher.search(&[root("bucket")], &HashMap::new()).await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].all_partitions.len(), 2);
        assert!(!responses[0].last_result.is_paused());
    }

    #[tokio::test]
    async fn cumulative_partitions_only_grow() {
        let storage = Arc::new(MemoryStorage::new());
        storage.put_object("bucket", "prefix1/1.txt", "a");

        let lister = DirectoryLister::new(storage.clone(), Arc::new(TestClock::new()), 1000);
        let searcher = PartitionSearcher::new(lister, Arc::new(TestClock::new()), 0, 1000, Duration::ZERO);

        let first = searcher.search(&[root("bucket")], &HashMap::new()).await.unwrap();
        let mut previous = HashMap::new();
        previous.insert(root("bucket"), first[0].clone());

        storage.put_object("bucket", "prefix2/2.txt", "b");
        let second = searcher.search(&[root("bucket")], &previous).await.unwrap();

        assert!(second[0].all_partitions.is_superset(&first[0].all_partitions));
        assert_eq!(second[0].all_partitions.len(), 2);
    }
}
