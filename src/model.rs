//! Core data model shared by discovery, reading, and the task state machine.
//!
//! See `SPEC_FULL.md` §3 for the authoritative description of each type's
//! invariants.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

/// A configured ingestion root: a bucket, optional prefix under it, and
/// whether trailing-slash "directory marker" objects are treated specially.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootLocation {
    pub bucket: String,
    pub prefix: Option<String>,
    pub allow_slash: bool,
}

impl RootLocation {
    pub fn new(bucket: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix,
            allow_slash: true,
        }
    }

    /// The prefix to list from, normalized to have no leading `/` and either
    /// no trailing `/` or be empty (bucket root).
    pub fn list_prefix(&self) -> String {
        match &self.prefix {
            None => String::new(),
            Some(p) => {
                let trimmed = p.trim_matches('/');
                if trimmed.is_empty() {
                    String::new()
                } else {
                    format!("{trimmed}/")
                }
            }
        }
    }

    /// Number of `/`-delimited segments in the root's prefix, used to find
    /// the depth at which immediate subdirectories live.
    pub fn prefix_depth(&self) -> usize {
        let p = self.list_prefix();
        if p.is_empty() {
            0
        } else {
            p.matches('/').count()
        }
    }
}

/// A fully qualified object location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathLocation {
    pub bucket: String,
    pub key: String,
}

impl PathLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// An offset: a specific line within a specific object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathWithLine {
    pub path: PathLocation,
    pub line: i64,
}

impl PathWithLine {
    pub fn new(path: PathLocation, line: i64) -> Self {
        Self { path, line }
    }
}

/// Offsets order lexicographically on key, then numerically on line —
/// the monotonic-offset invariant from `SPEC_FULL.md` §3 depends on this.
impl PartialOrd for PathWithLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathWithLine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .key
            .cmp(&other.path.key)
            .then_with(|| self.line.cmp(&other.line))
    }
}

/// Bounds for a single `findDirectories` invocation.
#[derive(Debug, Clone)]
pub struct DirectoryFindConfig {
    pub recurse_levels: u32,
    pub max_prefixes_before_pause: Option<usize>,
    pub wall_clock_deadline: Option<Instant>,
}

impl Default for DirectoryFindConfig {
    fn default() -> Self {
        Self {
            recurse_levels: 0,
            max_prefixes_before_pause: Some(1000),
            wall_clock_deadline: None,
        }
    }
}

/// A token permitting a paused listing to resume where it left off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinueFrom {
    pub last_prefix: String,
    pub resume_after_key: String,
}

/// The outcome of one `findDirectories` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryFindResult {
    /// The listing was exhausted; `prefixes` holds every newly discovered
    /// partition prefix, in discovery order.
    Completed { prefixes: Vec<String> },
    /// The listing was paused before exhaustion.
    Paused {
        prefixes: Vec<String>,
        last_prefix: String,
        continuation_key: String,
    },
}

impl DirectoryFindResult {
    pub fn prefixes(&self) -> &[String] {
        match self {
            DirectoryFindResult::Completed { prefixes } => prefixes,
            DirectoryFindResult::Paused { prefixes, .. } => prefixes,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, DirectoryFindResult::Paused { .. })
    }

    /// The continuation to pass into the next call, if this result paused.
    pub fn continue_from(&self) -> Option<ContinueFrom> {
        match self {
            DirectoryFindResult::Completed { .. } => None,
            DirectoryFindResult::Paused {
                last_prefix,
                continuation_key,
                ..
            } => Some(ContinueFrom {
                last_prefix: last_prefix.clone(),
                resume_after_key: continuation_key.clone(),
            }),
        }
    }
}

/// Per-root discovery state, mutated once per search cycle.
#[derive(Debug, Clone)]
pub struct PartitionSearcherResponse {
    pub root: RootLocation,
    pub observed_at: chrono::DateTime<chrono::Utc>,
    /// Every partition prefix ever discovered under this root, in discovery
    /// order. Only grows within a process run.
    pub all_partitions: IndexSet<String>,
    pub last_result: DirectoryFindResult,
}

impl PartitionSearcherResponse {
    pub fn continue_from(&self) -> Option<ContinueFrom> {
        self.last_result.continue_from()
    }
}

/// One decoded record produced by a `FormatStreamReader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceData {
    pub partition: i32,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

/// A bounded, ordered batch of records produced by one poll of one
/// `ReaderManager`, annotated with routing metadata.
#[derive(Debug, Clone)]
pub struct PollBatch {
    pub records: Vec<SourceData>,
    pub origin: PathLocation,
    pub target_topic: String,
    /// The `(key, line)` reached after the last record in this batch. The
    /// host persists this as its resumption checkpoint — passing it back
    /// through `contextOffsetFn` is what lets a `ReaderManager` resume mid-
    /// object on restart (`SPEC_FULL.md` §6).
    pub offset: PathWithLine,
}

impl PollBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// The result of one `SourceTask::poll`: batches from every partition that
/// produced records this cycle, plus the first per-partition failure
/// encountered (if any) — per `spec.md` §7's propagation policy, a failing
/// partition never withholds the others' records.
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub batches: Vec<PollBatch>,
    pub error: Option<crate::error::SourceError>,
}

impl PollOutcome {
    pub fn total_records(&self) -> usize {
        self.batches.iter().map(PollBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
