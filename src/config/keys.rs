//! Configuration key names, defaults, and the deprecated-key remapper.

use std::collections::HashMap;

pub const RECURSE_LEVELS: &str = "connect.s3.source.partition.search.recurse.levels";
pub const SEARCH_INTERVAL_MILLIS: &str = "connect.s3.source.partition.search.interval.millis";
pub const PAUSE_AFTER_COUNT: &str = "connect.s3.source.partition.search.pause.after.count";
pub const PAUSE_AFTER_MILLIS: &str = "connect.s3.source.partition.search.pause.after.millis";
pub const SEARCH_BLOCK: &str = "connect.s3.source.partition.search.block";
pub const EXTRACTOR_TYPE: &str = "connect.s3.source.partition.extractor.type";
pub const EXTRACTOR_REGEX: &str = "connect.s3.source.partition.extractor.regex";
pub const KCQL: &str = "connect.s3.kcql";

pub const AWS_REGION: &str = "aws.region";
pub const AWS_ACCESS_KEY: &str = "aws.access.key";
pub const AWS_SECRET_KEY: &str = "aws.secret.key";
pub const AWS_AUTH_MODE: &str = "aws.auth.mode";
pub const AWS_CUSTOM_ENDPOINT: &str = "aws.custom.endpoint";
pub const AWS_VHOST_BUCKET: &str = "aws.vhost.bucket";

pub const DEFAULT_RECURSE_LEVELS: u32 = 0;
pub const DEFAULT_SEARCH_INTERVAL_MILLIS: u64 = 300_000;
pub const DEFAULT_PAUSE_AFTER_COUNT: usize = 1000;
pub const DEFAULT_PAUSE_AFTER_MILLIS: u64 = 0;
pub const DEFAULT_SEARCH_BLOCK: bool = false;
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Legacy key -> current key. Applied before validation so renamed keys from
/// older releases keep working.
fn deprecated_aliases() -> &'static [(&'static str, &'static str)] {
    &[(
        "connect.s3.source.partition_search.recurse.levels",
        RECURSE_LEVELS,
    )]
}

/// Lower-cases every key and remaps deprecated keys to their current name.
/// If both a deprecated and current key are present, the current key wins.
pub fn normalize(raw: &HashMap<String, String>) -> HashMap<String, String> {
    let mut normalized: HashMap<String, String> = raw
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();

    for (legacy, current) in deprecated_aliases() {
        if let Some(value) = normalized.remove(*legacy) {
            normalized.entry(current.to_string()).or_insert(value);
        }
    }

    normalized
}
