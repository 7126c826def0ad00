use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::S3Settings;
use crate::services::storage::{StorageBackend, StorageError};

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    pub bucket_name: String,
}

impl S3Storage {
    pub async fn new(settings: &S3Settings) -> Self {
        let region = aws_sdk_s3::config::Region::new(settings.region.clone());

        let mut builder = match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(key), Some(secret)) => {
                let credentials = aws_sdk_s3::config::Credentials::new(
                    key.clone(),
                    secret.clone(),
                    None,
                    None,
                    "folio_cms_env",
                );
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .credentials_provider(credentials)
            }
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        }
        .region(region);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket_name: settings.bucket.clone(),
        }
    }

    /// Public base URL for objects in the bucket.
    pub fn public_base_url(settings: &S3Settings) -> String {
        match &settings.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), settings.bucket),
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                settings.bucket, settings.region
            ),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(path)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Remote(format!("put {path}: {e}")))?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        // S3 treats deleting a missing key as success.
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Remote(format!("delete {path}: {e}")))?;

        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::Remote(format!("head {path}: {e}")))
                }
            }
        }
    }
}
