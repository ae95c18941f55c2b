//! (De)serialization of the external offset-store key/value shapes the host
//! persists per partition.

use crate::model::PathWithLine;
use serde::{Deserialize, Serialize};

/// `{"container":"<bucket>","prefix":"<partition-prefix>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetKey {
    pub container: String,
    pub prefix: String,
}

/// `{"path":"<object-key>","line":<int>,"ts":<epochMillis>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetValue {
    pub path: String,
    pub line: i64,
    pub ts: i64,
}

impl OffsetKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("OffsetKey serialization is infallible")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl OffsetValue {
    pub fn new(bucket_relative_path: impl Into<String>, line: i64, ts: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            path: bucket_relative_path.into(),
            line,
            ts: ts.timestamp_millis(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("OffsetValue serialization is infallible")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Converts to a [`PathWithLine`] against a given bucket, for feeding the
    /// `contextOffsetFn` a `ReaderManager` consults on construction.
    pub fn to_path_with_line(&self, bucket: &str) -> PathWithLine {
        PathWithLine::new(
            crate::model::PathLocation::new(bucket, self.path.clone()),
            self.line,
        )
    }
}
