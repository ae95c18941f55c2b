//! Error taxonomy surfaced to the host framework.
//!
//! Keeps a per-layer `thiserror` enum for each subsystem (see
//! `storage::StorageError`, `config::ConfigError`, `task::StateError`) but
//! unifies them behind one tagged type at the outward `start`/`poll`/`close`
//! boundary.

use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::task::StateError;
use thiserror::Error;

/// Result type used at the task boundary.
pub type SourceResult<T = ()> = Result<T, SourceError>;

/// Errors the host-facing task can surface from `start`/`poll`/`close`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Invalid or unparseable configuration; fatal at `start`.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Object-store operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Illegal operation for the task's current state.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// A programming invariant was violated; always fatal.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl SourceError {
    /// Whether the host should treat this as fatal to the task, as opposed
    /// to advisory (retry next poll) or per-partition (other partitions
    /// still make progress).
    pub fn is_fatal(&self) -> bool {
        match self {
            SourceError::Config(_) => true,
            SourceError::State(_) => true,
            SourceError::InternalInvariant(_) => true,
            SourceError::Storage(e) => e.is_fatal(),
        }
    }
}
