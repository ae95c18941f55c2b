//! Storage Capability: abstract operations against the object store.
//!
//! `DirectoryLister` (see `crate::discovery::lister`) is layered on top of
//! [`StorageCapability::list`] rather than the capability itself declaring a
//! `find_directories` method — keeping the delimiter/pause/continuation
//! algorithm out of every backend implementation, per `SPEC_FULL.md` §4.2.

pub mod memory;
pub mod s3;

use crate::model::PathLocation;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by a [`StorageCapability`] operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("listing failed: {0}")]
    Listing(String),

    #[error("transient storage error, retry on next poll: {0}")]
    Transient(String),

    #[error("authentication/permission error: {0}")]
    Auth(String),

    #[error("malformed record in {path:?} at line {line}: {reason}")]
    Malformed {
        path: PathLocation,
        line: i64,
        reason: String,
    },
}

impl StorageError {
    /// `Auth` errors are fatal for the task; everything else is advisory or
    /// scoped to the partition/record that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::Auth(_))
    }
}

/// Metadata about a single object, as returned by `head`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a flat, paginated listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_token: Option<String>,
}

/// Abstract operations against an S3-compatible object store.
///
/// The core source path only exercises `list`, `head`, and `get`; `put` and
/// `delete` exist for the sink-side collaborator described in `spec.md` §6
/// and are not called anywhere in this crate's discovery/read pipeline.
#[async_trait]
pub trait StorageCapability: Send + Sync {
    /// Flat, paginated listing of keys under `bucket`/`prefix`, optionally
    /// resuming after a previously returned key.
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        after_key: Option<&str>,
        max: usize,
    ) -> Result<ListPage, StorageError>;

    async fn head(&self, path: &PathLocation) -> Result<ObjectMeta, StorageError>;

    /// Fetches the full object body. The core never caches this beyond the
    /// lifetime of the `FormatStreamReader` that owns it.
    async fn get(&self, path: &PathLocation) -> Result<Bytes, StorageError>;

    /// Sink-side collaborator; not exercised by the source pipeline.
    async fn put(&self, path: &PathLocation, payload: Bytes) -> Result<(), StorageError>;

    /// Sink-side collaborator; not exercised by the source pipeline.
    async fn delete(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError>;
}
