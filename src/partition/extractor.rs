//! Partition-number extraction, used only to label [`crate::model::SourceData`]
//! for a downstream partition function — it never affects which
//! `ReaderManager` owns a key.
//!
//! An absent extractor type behaves exactly like [`PartitionExtractor::Hierarchical`]
//! (see the Open Question in `spec.md` §9, resolved in `DESIGN.md`).

use regex::Regex;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub enum PartitionExtractor {
    /// Partition id derived from the whole object key.
    Hierarchical,
    /// Partition id is capture group 1 of the regex, parsed as an integer.
    /// Falls back to `Hierarchical` behavior if the regex does not match.
    Regex(Regex),
}

impl PartitionExtractor {
    pub fn extract(&self, key: &str) -> i32 {
        match self {
            PartitionExtractor::Hierarchical => hash_to_partition(key),
            PartitionExtractor::Regex(re) => re
                .captures(key)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<i32>().ok())
                .unwrap_or_else(|| {
                    tracing::warn!(key, "partition regex did not match, falling back to hierarchical");
                    hash_to_partition(key)
                }),
        }
    }
}

fn hash_to_partition(key: &str) -> i32 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as i64 & 0x7fff_ffff) as i32
}
