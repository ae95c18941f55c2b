//! Configuration parsing: key normalization, deprecation remapping,
//! validation, and the typed [`SourceConfig`] it produces.

pub mod aws;
pub mod keys;
pub mod source_config;

pub use aws::{AwsAuthMode, AwsClientConfig};
pub use source_config::SourceConfig;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {errors:?}")]
    Invalid { errors: Vec<String> },
}
