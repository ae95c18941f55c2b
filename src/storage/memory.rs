//! An in-memory [`StorageCapability`], used by tests and the CLI demo.

use super::{ListPage, ObjectMeta, StorageCapability, StorageError};
use crate::model::PathLocation;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A store of `bucket/key -> bytes`, listed back in lexicographic key order
/// (matching S3's `ListObjectsV2` ordering), which the monotonic-offset and
/// pause-correctness invariants rely on.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.objects
            .write()
            .expect("memory storage poisoned")
            .insert(format!("{bucket}/{key}"), body.into());
    }

    fn full_key(bucket: &str, key: &str) -> String {
        format!("{bucket}/{key}")
    }
}

#[async_trait]
impl StorageCapability for MemoryStorage {
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        after_key: Option<&str>,
        max: usize,
    ) -> Result<ListPage, StorageError> {
        let objects = self.objects.read().expect("memory storage poisoned");
        let bucket_prefix = format!("{bucket}/");
        let full_prefix = format!("{bucket_prefix}{prefix}");

        let after_full = after_key.map(|k| Self::full_key(bucket, k));

        let mut keys: Vec<String> = objects
            .range(full_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&full_prefix))
            .map(|(k, _)| k.strip_prefix(&bucket_prefix).unwrap().to_string())
            .filter(|k| match &after_full {
                Some(after) => format!("{bucket_prefix}{k}").as_str() > after.as_str(),
                None => true,
            })
            .collect();

        keys.sort();

        let next_token = if keys.len() > max {
            keys.truncate(max);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn head(&self, path: &PathLocation) -> Result<ObjectMeta, StorageError> {
        let objects = self.objects.read().expect("memory storage poisoned");
        let full = Self::full_key(&path.bucket, &path.key);
        let body = objects
            .get(&full)
            .ok_or_else(|| StorageError::NotFound {
                bucket: path.bucket.clone(),
                key: path.key.clone(),
            })?;
        Ok(ObjectMeta {
            size: body.len() as u64,
            last_modified: Some(Utc::now()),
        })
    }

    async fn get(&self, path: &PathLocation) -> Result<Bytes, StorageError> {
        let objects = self.objects.read().expect("memory storage poisoned");
        let full = Self::full_key(&path.bucket, &path.key);
        objects
            .get(&full)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: path.bucket.clone(),
                key: path.key.clone(),
            })
    }

    async fn put(&self, path: &PathLocation, payload: Bytes) -> Result<(), StorageError> {
        self.objects
            .write()
            .expect("memory storage poisoned")
            .insert(Self::full_key(&path.bucket, &path.key), payload);
        Ok(())
    }

    async fn delete(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.write().expect("memory storage poisoned");
        for key in keys {
            objects.remove(&Self::full_key(bucket, key));
        }
        Ok(())
    }
}
