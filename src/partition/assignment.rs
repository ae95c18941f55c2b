//! Deterministic `(taskCount, taskIndex)` sharding of configured roots.
//!
//! Every configured root (bucket + prefix) belongs to exactly one task
//! instance, computed from a stable hash so the assignment is reproducible
//! across restarts without any coordination between task instances.

use crate::model::RootLocation;

fn stable_hash(root: &RootLocation) -> u64 {
    // `DefaultHasher` is seeded per-process by libstd's `RandomState`, which
    // would make assignment non-reproducible across restarts; use a fixed
    // FNV-1a pass over the field bytes instead.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut fold = |bytes: &[u8]| {
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    };
    fold(root.bucket.as_bytes());
    fold(root.list_prefix().as_bytes());
    hash
}

/// Returns the subset of `roots` owned by `task_index` out of `task_count`
/// total task instances.
pub fn assign(roots: &[RootLocation], task_count: u32, task_index: u32) -> Vec<RootLocation> {
    assert!(task_count > 0, "task_count must be at least 1");
    assert!(task_index < task_count, "task_index out of range");

    roots
        .iter()
        .filter(|root| (stable_hash(root) % task_count as u64) as u32 == task_index)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(bucket: &str, prefix: &str) -> RootLocation {
        RootLocation::new(bucket, Some(prefix.to_string()))
    }

    #[test]
    fn every_root_owned_by_exactly_one_task() {
        let roots: Vec<RootLocation> = (0..37)
            .map(|i| root("bucket", &format!("prefix-{i}")))
            .collect();
        let task_count = 5;

        let mut owners = vec![0usize; roots.len()];
        for task_index in 0..task_count {
            for assigned in assign(&roots, task_count, task_index) {
                let idx = roots.iter().position(|r| r == &assigned).unwrap();
                owners[idx] += 1;
            }
        }

        assert!(owners.iter().all(|&count| count == 1));
    }

    #[test]
    fn assignment_is_stable_across_calls() {
        let roots = vec![root("bucket", "a"), root("bucket", "b")];
        let first = assign(&roots, 3, 1);
        let second = assign(&roots, 3, 1);
        assert_eq!(first, second);
    }
}
