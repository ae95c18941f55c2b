//! Registry of [`ReaderManager`]s keyed by `(root, partition)`, refreshed
//! from the [`PartitionSearcher`] on a debounce (`spec.md` §4.7).

use super::reader_manager::ReaderManager;
use crate::discovery::PartitionSearcher;
use crate::model::{PartitionSearcherResponse, RootLocation};
use crate::storage::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Builds a [`ReaderManager`] for a freshly discovered `(root, prefix)`
/// pair. Implementations own consulting the host's `contextOffsetFn`, since
/// the Service itself has no opinion on offset storage.
#[async_trait]
pub trait ManagerFactory: Send + Sync {
    async fn create(&self, root: &RootLocation, partition_prefix: &str) -> Result<ReaderManager, StorageError>;
}

pub struct ReaderManagerService {
    roots: Vec<RootLocation>,
    searcher: PartitionSearcher,
    search_interval: Duration,
    factory: std::sync::Arc<dyn ManagerFactory>,
    responses: HashMap<RootLocation, PartitionSearcherResponse>,
    /// Keyed by `(root index, prefix)` so the natural `BTreeMap` order is
    /// exactly the "root index, then prefix lex" order §4.7 requires.
    managers: BTreeMap<(usize, String), ReaderManager>,
}

impl ReaderManagerService {
    pub fn new(
        roots: Vec<RootLocation>,
        searcher: PartitionSearcher,
        search_interval: Duration,
        factory: std::sync::Arc<dyn ManagerFactory>,
    ) -> Self {
        Self {
            roots,
            searcher,
            search_interval,
            factory,
            responses: HashMap::new(),
            managers: BTreeMap::new(),
        }
    }

    /// Refreshes partition knowledge (subject to the search debounce),
    /// instantiates Managers for newly discovered partitions, and returns
    /// every Manager currently known in stable order.
    pub async fn get_reader_managers(&mut self) -> Result<Vec<&mut ReaderManager>, StorageError> {
        self.refresh().await?;
        Ok(self.managers.values_mut().collect())
    }

    /// Returns the Managers known so far without triggering a discovery
    /// refresh — used when `connect.s3.source.partition.search.block` is
    /// `false` and a prior `poll` has already discovered at least once.
    pub fn current_managers(&mut self) -> Vec<&mut ReaderManager> {
        self.managers.values_mut().collect()
    }

    pub fn manager_count(&self) -> usize {
        self.managers.len()
    }

    pub fn close_all(&mut self) {
        for manager in self.managers.values_mut() {
            manager.close();
        }
    }

    async fn refresh(&mut self) -> Result<(), StorageError> {
        let now = Utc::now();

        let stale: Vec<RootLocation> = self
            .roots
            .iter()
            .filter(|root| {
                let prior = self.responses.get(*root);
                should_search(
                    prior.map(|r| r.observed_at),
                    prior.is_some_and(|r| r.last_result.is_paused()),
                    now,
                    self.search_interval,
                )
            })
            .cloned()
            .collect();

        if !stale.is_empty() {
            for response in self.searcher.search(&stale, &self.responses).await? {
                self.responses.insert(response.root.clone(), response);
            }
        }

        for (idx, root) in self.roots.iter().enumerate() {
            let Some(response) = self.responses.get(root) else {
                continue;
            };
            for prefix in response.all_partitions.iter() {
                let key = (idx, prefix.clone());
                if self.managers.contains_key(&key) {
                    continue;
                }
                let manager = self.factory.create(root, prefix).await?;
                self.managers.insert(key, manager);
            }
        }

        Ok(())
    }
}

/// Whether a root's partition knowledge needs refreshing: always true if
/// never searched, always true if the last search paused (resume ASAP
/// regardless of interval), otherwise only once `search_interval` has
/// elapsed since `observed_at`.
fn should_search(observed_at: Option<DateTime<Utc>>, last_was_paused: bool, now: DateTime<Utc>, search_interval: Duration) -> bool {
    let Some(observed_at) = observed_at else {
        return true;
    };
    if last_was_paused {
        return true;
    }
    match (now - observed_at).to_std() {
        Ok(age) => age >= search_interval,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn never_searched_always_searches() {
        assert!(should_search(None, false, Utc::now(), Duration::from_secs(60)));
    }

    #[test]
    fn paused_search_always_retries_regardless_of_interval() {
        let now = Utc::now();
        let observed_at = now - ChronoDuration::milliseconds(1);
        assert!(should_search(Some(observed_at), true, now, Duration::from_secs(300)));
    }

    #[test]
    fn completed_search_within_interval_is_skipped() {
        let now = Utc::now();
        let observed_at = now - ChronoDuration::milliseconds(10);
        assert!(!should_search(Some(observed_at), false, now, Duration::from_secs(60)));
    }

    #[test]
    fn completed_search_past_interval_is_refreshed() {
        let now = Utc::now();
        let observed_at = now - ChronoDuration::seconds(61);
        assert!(should_search(Some(observed_at), false, now, Duration::from_secs(60)));
    }

    struct MemoryFactory {
        storage: std::sync::Arc<dyn crate::storage::StorageCapability>,
    }

    #[async_trait]
    impl ManagerFactory for MemoryFactory {
        async fn create(&self, root: &RootLocation, partition_prefix: &str) -> Result<ReaderManager, StorageError> {
            ReaderManager::new(
                root.bucket.clone(),
                partition_prefix.to_string(),
                "my-topic",
                super::super::reader_manager::FormatKind::Bytes,
                self.storage.clone(),
                std::sync::Arc::new(crate::partition::PartitionExtractor::Hierarchical),
                None,
            )
            .await
        }
    }

    #[tokio::test]
    async fn discovers_partitions_and_never_removes_them() {
        use crate::clock::SystemClock;
        use crate::discovery::DirectoryLister;
        use crate::storage::memory::MemoryStorage;
        use crate::storage::StorageCapability;

        let memory = std::sync::Arc::new(MemoryStorage::new());
        memory.put_object("bucket", "prefix1/1.txt", "a");
        memory.put_object("bucket", "prefix2/2.txt", "b");
        let storage: std::sync::Arc<dyn StorageCapability> = memory.clone();

        let lister = DirectoryLister::new(storage.clone(), std::sync::Arc::new(SystemClock), 1000);
        let searcher = PartitionSearcher::new(lister, std::sync::Arc::new(SystemClock), 0, 1000, Duration::ZERO);
        let root = RootLocation::new("bucket", None);
        let factory = std::sync::Arc::new(MemoryFactory { storage: storage.clone() });

        let mut service = ReaderManagerService::new(vec![root.clone()], searcher, Duration::ZERO, factory);

        let first = service.get_reader_managers().await.unwrap();
        assert_eq!(first.len(), 2);
        drop(first);

        // A second refresh (debounce disabled) must pick up a newly
        // discovered partition without dropping the first two.
        memory.put_object("bucket", "prefix3/3.txt", "c");

        let second = service.get_reader_managers().await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(service.manager_count(), 3);
    }
}
