//! Typed, validated source configuration assembled from a property map.

use super::aws::AwsClientConfig;
use super::{keys, ConfigError};
use crate::partition::PartitionExtractor;
use crate::routing::{self, RoutingMapping};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub recurse_levels: u32,
    pub search_interval: Duration,
    pub pause_after_count: usize,
    pub pause_after: Duration,
    pub block: bool,
    pub aws: AwsClientConfig,
    pub mappings: Vec<RoutingMapping>,
    pub partition_extractor: PartitionExtractor,
}

impl SourceConfig {
    /// Parses and validates a raw property map (as handed to the connector
    /// by the embedding framework). Keys are lower-cased and deprecated keys
    /// are remapped before validation; every validation failure is
    /// collected, not just the first.
    pub fn parse(raw: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let props = keys::normalize(raw);
        let mut errors = Vec::new();

        let recurse_levels = parse_or_default(&props, keys::RECURSE_LEVELS, keys::DEFAULT_RECURSE_LEVELS, &mut errors);
        let search_interval_millis = parse_or_default(
            &props,
            keys::SEARCH_INTERVAL_MILLIS,
            keys::DEFAULT_SEARCH_INTERVAL_MILLIS,
            &mut errors,
        );
        let pause_after_count = parse_or_default(
            &props,
            keys::PAUSE_AFTER_COUNT,
            keys::DEFAULT_PAUSE_AFTER_COUNT,
            &mut errors,
        );
        let pause_after_millis = parse_or_default(
            &props,
            keys::PAUSE_AFTER_MILLIS,
            keys::DEFAULT_PAUSE_AFTER_MILLIS,
            &mut errors,
        );
        let block = parse_or_default(&props, keys::SEARCH_BLOCK, keys::DEFAULT_SEARCH_BLOCK, &mut errors);

        let partition_extractor = parse_extractor(&props, &mut errors);

        let mappings = match props.get(keys::KCQL) {
            None => {
                errors.push(format!("{} is required", keys::KCQL));
                Vec::new()
            }
            Some(raw_kcql) => match routing::parse_all(raw_kcql) {
                Ok(mappings) if mappings.is_empty() => {
                    errors.push(format!("{} must contain at least one expression", keys::KCQL));
                    Vec::new()
                }
                Ok(mappings) => mappings,
                Err(e) => {
                    errors.push(format!("{} parse error: {e}", keys::KCQL));
                    Vec::new()
                }
            },
        };

        let aws = AwsClientConfig::parse(&props, &mut errors);

        if !errors.is_empty() {
            return Err(ConfigError::Invalid { errors });
        }

        Ok(Self {
            recurse_levels,
            search_interval: Duration::from_millis(search_interval_millis),
            pause_after_count,
            pause_after: Duration::from_millis(pause_after_millis),
            block,
            aws,
            mappings,
            partition_extractor,
        })
    }
}

fn parse_or_default<T>(
    props: &HashMap<String, String>,
    key: &str,
    default: T,
    errors: &mut Vec<String>,
) -> T
where
    T: std::str::FromStr,
{
    match props.get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(format!("{key} has an invalid value: '{raw}'"));
            default
        }),
    }
}

fn parse_extractor(props: &HashMap<String, String>, errors: &mut Vec<String>) -> PartitionExtractor {
    match props.get(keys::EXTRACTOR_TYPE).map(String::as_str) {
        None => PartitionExtractor::Hierarchical,
        Some("hierarchical") => PartitionExtractor::Hierarchical,
        Some("regex") => match props.get(keys::EXTRACTOR_REGEX) {
            None => {
                errors.push(format!(
                    "{} requires {}",
                    keys::EXTRACTOR_TYPE,
                    keys::EXTRACTOR_REGEX
                ));
                PartitionExtractor::Hierarchical
            }
            Some(pattern) => match Regex::new(pattern) {
                Ok(re) => PartitionExtractor::Regex(re),
                Err(e) => {
                    errors.push(format!("{} is not a valid regex: {e}", keys::EXTRACTOR_REGEX));
                    PartitionExtractor::Hierarchical
                }
            },
        },
        Some(other) => {
            errors.push(format!(
                "{} must be 'hierarchical' or 'regex', got '{other}'",
                keys::EXTRACTOR_TYPE
            ));
            PartitionExtractor::Hierarchical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_props() -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert(
            keys::KCQL.to_string(),
            "INSERT INTO mytopic SELECT * FROM mybucket/myprefix".to_string(),
        );
        props
    }

    #[test]
    fn defaults_match_spec() {
        let config = SourceConfig::parse(&base_props()).unwrap();
        assert_eq!(config.recurse_levels, keys::DEFAULT_RECURSE_LEVELS);
        assert_eq!(
            config.search_interval,
            Duration::from_millis(keys::DEFAULT_SEARCH_INTERVAL_MILLIS)
        );
        assert_eq!(config.pause_after_count, keys::DEFAULT_PAUSE_AFTER_COUNT);
        assert_eq!(config.pause_after, Duration::from_millis(keys::DEFAULT_PAUSE_AFTER_MILLIS));
        assert!(!config.block);
    }

    #[test]
    fn missing_kcql_is_an_error() {
        let props = HashMap::new();
        let err = SourceConfig::parse(&props).unwrap_err();
        match err {
            ConfigError::Invalid { errors } => {
                assert!(errors.iter().any(|e| e.contains(keys::KCQL)));
            }
        }
    }

    #[test]
    fn collects_every_validation_error_in_one_pass() {
        let mut props = base_props();
        props.insert(keys::RECURSE_LEVELS.to_string(), "not-a-number".to_string());
        props.insert(keys::SEARCH_BLOCK.to_string(), "not-a-bool".to_string());

        let err = SourceConfig::parse(&props).unwrap_err();
        match err {
            ConfigError::Invalid { errors } => {
                assert_eq!(errors.len(), 2, "expected both errors collected: {errors:?}");
            }
        }
    }

    #[test]
    fn deprecated_recurse_levels_key_is_remapped() {
        let mut props = base_props();
        props.insert(
            "connect.s3.source.partition_search.recurse.levels".to_string(),
            "3".to_string(),
        );
        let config = SourceConfig::parse(&props).unwrap();
        assert_eq!(config.recurse_levels, 3);
    }

    #[test]
    fn keys_are_lowercased_at_ingress() {
        let mut props = HashMap::new();
        props.insert(
            keys::KCQL.to_uppercase(),
            "INSERT INTO mytopic SELECT * FROM mybucket".to_string(),
        );
        let config = SourceConfig::parse(&props).unwrap();
        assert_eq!(config.mappings.len(), 1);
    }
}
