//! AWS S3 (or S3-compatible) implementation of [`StorageCapability`].
//!
//! Client construction follows the same shape as other S3-backed storage
//! layers: a credentials chain, an optional custom endpoint forcing
//! path-style addressing, and a bounded retry policy delegated to the SDK.

use super::{ListPage, ObjectMeta, StorageCapability, StorageError};
use crate::config::AwsClientConfig;
use crate::model::PathLocation;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use bytes::Bytes;

pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub async fn new(cfg: &AwsClientConfig) -> Result<Self, StorageError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()));

        if let (crate::config::AwsAuthMode::Credentials, Some(access), Some(secret)) =
            (&cfg.auth_mode, &cfg.access_key, &cfg.secret_key)
        {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "connect-s3-source",
            ));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = &cfg.custom_endpoint {
            builder = builder
                .endpoint_url(endpoint.clone())
                .force_path_style(!cfg.vhost_bucket);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    fn classify_sdk_error<E>(
        err: SdkError<E, aws_smithy_runtime_api::client::orchestrator::HttpResponse>,
    ) -> StorageError
    where
        E: std::error::Error + 'static,
    {
        match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                StorageError::Transient(err.to_string())
            }
            SdkError::ServiceError(service_err) => {
                let status = service_err.raw().status().as_u16();
                match status {
                    403 | 401 => StorageError::Auth(err.to_string()),
                    404 => StorageError::Transient(err.to_string()),
                    429 | 500..=599 => StorageError::Transient(err.to_string()),
                    _ => StorageError::Listing(err.to_string()),
                }
            }
            _ => StorageError::Listing(err.to_string()),
        }
    }
}

#[async_trait]
impl StorageCapability for S3Storage {
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        after_key: Option<&str>,
        max: usize,
    ) -> Result<ListPage, StorageError> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max as i32);

        if let Some(after) = after_key {
            request = request.start_after(after);
        }

        let output = request.send().await.map_err(Self::classify_sdk_error)?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect::<Vec<_>>();

        let next_token = if output.is_truncated().unwrap_or(false) {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn head(&self, path: &PathLocation) -> Result<ObjectMeta, StorageError> {
        let output = self
            .client
            .head_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(Self::classify_sdk_error)?;

        Ok(ObjectMeta {
            size: output.content_length().unwrap_or(0).max(0) as u64,
            last_modified: output
                .last_modified()
                .and_then(|dt| chrono::DateTime::from_timestamp(dt.secs(), 0)),
        })
    }

    async fn get(&self, path: &PathLocation) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(Self::classify_sdk_error)?;

        output
            .body
            .collect()
            .await
            .map(|data| data.into_bytes())
            .map_err(|e| StorageError::Transient(e.to_string()))
    }

    async fn put(&self, path: &PathLocation, payload: Bytes) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .body(payload.into())
            .send()
            .await
            .map_err(Self::classify_sdk_error)?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }
        let objects = keys
            .iter()
            .map(|k| {
                aws_sdk_s3::types::ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| StorageError::Listing(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let delete = aws_sdk_s3::types::Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| StorageError::Listing(e.to_string()))?;

        self.client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(Self::classify_sdk_error)?;
        Ok(())
    }
}
