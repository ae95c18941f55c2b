//! Paginated, delimiter-based partition discovery with a pause/resume token.
//!
//! `find_directories` is layered on top of [`StorageCapability::list`]
//! (a flat, paginated listing) rather than requiring every storage backend
//! to implement delimiter-aware listing itself — see `SPEC_FULL.md` §4.2 for
//! the design rationale.

use crate::clock::Clock;
use crate::model::{ContinueFrom, DirectoryFindConfig, DirectoryFindResult, RootLocation};
use crate::storage::{StorageCapability, StorageError};
use indexmap::IndexSet;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Walks flat listings of a root and derives the set of immediate
/// partition prefixes beneath it, honoring pause thresholds so a single
/// call is bounded.
pub struct DirectoryLister {
    storage: Arc<dyn StorageCapability>,
    clock: Arc<dyn Clock>,
    /// Page size used for the underlying `list` calls. Not part of
    /// `SPEC_FULL.md`'s `DirectoryFindConfig`; kept as a constructor
    /// parameter so callers can tune it independently of pause thresholds.
    list_page_size: usize,
}

impl DirectoryLister {
    pub fn new(storage: Arc<dyn StorageCapability>, clock: Arc<dyn Clock>, list_page_size: usize) -> Self {
        Self {
            storage,
            clock,
            list_page_size,
        }
    }

    pub async fn find_directories(
        &self,
        root: &RootLocation,
        cfg: &DirectoryFindConfig,
        exclude: &HashSet<String>,
        continue_from: Option<&ContinueFrom>,
    ) -> Result<DirectoryFindResult, StorageError> {
        let list_prefix = root.list_prefix();
        let needed_components = cfg.recurse_levels as usize + 1;

        let mut after_key = continue_from.map(|c| c.resume_after_key.clone());
        let mut found: IndexSet<String> = IndexSet::new();
        let mut last_seen_key: Option<String> = None;

        loop {
            let page = self
                .storage
                .list(&root.bucket, &list_prefix, after_key.as_deref(), self.list_page_size)
                .await?;

            let mut page_last_prefix: Option<String> = None;

            for key in &page.keys {
                last_seen_key = Some(key.clone());

                let Some(candidate) = candidate_prefix(&list_prefix, key, needed_components) else {
                    continue;
                };
                page_last_prefix = Some(candidate.clone());
                if exclude.contains(&candidate) || found.contains(&candidate) {
                    continue;
                }
                found.insert(candidate);
            }

            // Pause decisions are made at page boundaries, never mid-page, so
            // `continuation_key` is always the last key this call actually
            // consumed — resuming from it can never re-derive a candidate
            // this call already accounted for.
            if should_pause(cfg, found.len(), self.clock.as_ref()) {
                let last_prefix = page_last_prefix.or_else(|| found.iter().last().cloned()).unwrap_or_default();
                debug!(root = %root.bucket, found = found.len(), "directory lister pausing");
                return Ok(paused(found, last_prefix, last_seen_key));
            }

            match page.next_token {
                Some(token) => after_key = Some(token),
                None => break,
            }
        }

        debug!(root = %root.bucket, found = found.len(), "directory lister completed");
        Ok(DirectoryFindResult::Completed {
            prefixes: found.into_iter().collect(),
        })
    }
}

fn should_pause(cfg: &DirectoryFindConfig, found_len: usize, clock: &dyn Clock) -> bool {
    let count_pause = cfg
        .max_prefixes_before_pause
        .is_some_and(|max| max != 0 && found_len >= max);
    let deadline_pause = cfg.wall_clock_deadline.is_some_and(|dl| clock.now() >= dl);
    count_pause || deadline_pause
}

fn paused(found: IndexSet<String>, last_prefix: String, last_seen_key: Option<String>) -> DirectoryFindResult {
    DirectoryFindResult::Paused {
        prefixes: found.into_iter().collect(),
        last_prefix,
        continuation_key: last_seen_key.unwrap_or_default(),
    }
}

/// Derives the partition prefix a key belongs to, `needed_components`
/// levels below `list_prefix`. Returns `None` for keys lacking a delimiter
/// at that depth (per `spec.md` §4.2's "keys lacking the delimiter below
/// the root are ignored").
fn candidate_prefix(list_prefix: &str, key: &str, needed_components: usize) -> Option<String> {
    let relative = key.strip_prefix(list_prefix)?;
    if relative.is_empty() {
        return None;
    }
    let parts: Vec<&str> = relative.split('/').collect();
    if parts.len() < needed_components + 1 {
        return None;
    }
    Some(format!("{list_prefix}{}/", parts[..needed_components].join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::storage::memory::MemoryStorage;
    use std::time::Duration;

    fn seed_s1_s2() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "a");
        storage.put_object("bucket", "prefix1/2.txt", "b");
        storage.put_object("bucket", "prefix2/3.txt", "c");
        storage.put_object("bucket", "prefix2/4.txt", "d");
        storage.put_object("bucket", "prefix3/5.txt", "e");
        storage.put_object("bucket", "prefix3/6.txt", "f");
        storage.put_object("bucket", "prefix4/7.txt", "g");
        storage.put_object("bucket", "prefix4/8.txt", "h");
        storage
    }

    fn root() -> RootLocation {
        RootLocation {
            bucket: "bucket".to_string(),
            prefix: None,
            allow_slash: true,
        }
    }

    fn cfg() -> DirectoryFindConfig {
        DirectoryFindConfig {
            recurse_levels: 0,
            max_prefixes_before_pause: None,
            wall_clock_deadline: None,
        }
    }

    /// S1 — two prefixes, single page, completed.
    #[tokio::test]
    async fn s1_single_page_completed() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "prefix1/1.txt", "a");
        storage.put_object("bucket", "prefix1/2.txt", "b");
        storage.put_object("bucket", "prefix2/3.txt", "c");
        storage.put_object("bucket", "prefix2/4.txt", "d");

        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 1000);
        let result = lister
            .find_directories(&root(), &cfg(), &HashSet::new(), None)
            .await
            .unwrap();

        assert_eq!(
            result,
            DirectoryFindResult::Completed {
                prefixes: vec!["prefix1/".to_string(), "prefix2/".to_string()]
            }
        );
    }

    /// S2 — multi-page completion.
    #[tokio::test]
    async fn s2_multi_page_completed() {
        let storage = seed_s1_s2();
        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 4);
        let result = lister
            .find_directories(&root(), &cfg(), &HashSet::new(), None)
            .await
            .unwrap();

        assert_eq!(
            result,
            DirectoryFindResult::Completed {
                prefixes: vec![
                    "prefix1/".to_string(),
                    "prefix2/".to_string(),
                    "prefix3/".to_string(),
                    "prefix4/".to_string(),
                ]
            }
        );
    }

    /// S3 — exclusion.
    #[tokio::test]
    async fn s3_exclusion() {
        let storage = seed_s1_s2();
        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 4);
        let exclude: HashSet<String> = ["prefix1/".to_string(), "prefix4/".to_string()].into();
        let result = lister
            .find_directories(&root(), &cfg(), &exclude, None)
            .await
            .unwrap();

        assert_eq!(
            result,
            DirectoryFindResult::Completed {
                prefixes: vec!["prefix2/".to_string(), "prefix3/".to_string()]
            }
        );
    }

    /// S4 — pause after first page, property 2 (pause correctness).
    #[tokio::test]
    async fn s4_pause_after_first_page() {
        let storage = seed_s1_s2();
        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 4);
        let paused_cfg = DirectoryFindConfig {
            max_prefixes_before_pause: Some(2),
            ..cfg()
        };
        let result = lister
            .find_directories(&root(), &paused_cfg, &HashSet::new(), None)
            .await
            .unwrap();

        assert_eq!(
            result,
            DirectoryFindResult::Paused {
                prefixes: vec!["prefix1/".to_string(), "prefix2/".to_string()],
                last_prefix: "prefix2/".to_string(),
                continuation_key: "prefix2/4.txt".to_string(),
            }
        );
    }

    /// S5 — resume from S4's continuation.
    #[tokio::test]
    async fn s5_resume() {
        let storage = seed_s1_s2();
        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 4);
        let continuation = ContinueFrom {
            last_prefix: "prefix2/".to_string(),
            resume_after_key: "prefix2/4.txt".to_string(),
        };
        let result = lister
            .find_directories(&root(), &cfg(), &HashSet::new(), Some(&continuation))
            .await
            .unwrap();

        assert_eq!(
            result,
            DirectoryFindResult::Completed {
                prefixes: vec!["prefix3/".to_string(), "prefix4/".to_string()]
            }
        );
    }

    /// Property 1 — dedupe: excluded partitions are never re-emitted.
    #[tokio::test]
    async fn property_dedupe() {
        let storage = seed_s1_s2();
        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 4);
        let exclude: HashSet<String> = ["prefix1/", "prefix2/", "prefix3/", "prefix4/"]
            .into_iter()
            .map(String::from)
            .collect();
        let result = lister
            .find_directories(&root(), &cfg(), &exclude, None)
            .await
            .unwrap();
        assert_eq!(result.prefixes(), &[] as &[String]);
    }

    /// Property 2 — pause correctness: replaying the continuation yields the
    /// remainder without gaps or duplicates.
    #[tokio::test]
    async fn property_pause_then_resume_has_no_gaps_or_dupes() {
        let storage = seed_s1_s2();
        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 4);
        let paused_cfg = DirectoryFindConfig {
            max_prefixes_before_pause: Some(2),
            ..cfg()
        };
        let first = lister
            .find_directories(&root(), &paused_cfg, &HashSet::new(), None)
            .await
            .unwrap();
        assert!(first.is_paused());

        let second = lister
            .find_directories(&root(), &cfg(), &HashSet::new(), first.continue_from().as_ref())
            .await
            .unwrap();

        let mut all: Vec<String> = first.prefixes().to_vec();
        all.extend(second.prefixes().iter().cloned());
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), all.len(), "no duplicates across pause/resume");
        assert_eq!(
            all,
            vec!["prefix1/", "prefix2/", "prefix3/", "prefix4/"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    /// Property 6 — delimiter discipline.
    #[tokio::test]
    async fn property_keys_without_delimiter_are_ignored() {
        let storage = MemoryStorage::new();
        storage.put_object("bucket", "README.md", "not a partition");
        storage.put_object("bucket", "prefix1/1.txt", "a");

        let lister = DirectoryLister::new(Arc::new(storage), Arc::new(TestClock::new()), 1000);
        let result = lister
            .find_directories(&root(), &cfg(), &HashSet::new(), None)
            .await
            .unwrap();
        assert_eq!(result.prefixes(), &["prefix1/".to_string()]);
    }

    #[tokio::test]
    async fn wall_clock_deadline_pauses_even_without_count_threshold() {
        let storage = seed_s1_s2();
        let clock = Arc::new(TestClock::new());
        let lister = DirectoryLister::new(Arc::new(storage), clock.clone(), 4);
        clock.advance(Duration::from_secs(10));
        let past_cfg = DirectoryFindConfig {
            wall_clock_deadline: Some(clock.now()),
            ..cfg()
        };
        clock.advance(Duration::from_secs(1));

        let result = lister
            .find_directories(&root(), &past_cfg, &HashSet::new(), None)
            .await
            .unwrap();
        assert!(result.is_paused());
    }
}
