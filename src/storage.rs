//! S3 object store holding question documents, scripts, test cases and audio.
//!
//! Supports AWS S3 and S3-compatible endpoints (MinIO, localstack) for development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{info, instrument};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::layout;
use crate::ports::BlobStore;

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    /// Build a client from the default credential chain and the configured region/endpoint.
    pub async fn new(settings: &Settings) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.aws_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        info!(target: "storage", bucket = %settings.bucket, region = %settings.aws_region, custom_endpoint = settings.s3_endpoint.is_some(), "S3 storage initialized");

        Self {
            client,
            bucket: settings.bucket.clone(),
            region: settings.aws_region.clone(),
            endpoint: settings.s3_endpoint.clone(),
        }
    }

    /// Same store pointed at another bucket (batch jobs receive the bucket in the event).
    pub fn with_bucket(&self, bucket: &str) -> Self {
        Self { bucket: bucket.to_string(), ..self.clone() }
    }
}

#[async_trait]
impl BlobStore for S3Storage {
    #[instrument(level = "info", skip(self, body), fields(bucket = %self.bucket, size = body.len()))]
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> AppResult<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {} to S3: {}", key, e.into_service_error())))?;
        Ok(self.public_url(key))
    }

    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("Object {}", key))
                } else {
                    AppError::Storage(format!("Failed to get {} from S3: {}", key, service_error))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();
        Ok(data)
    }

    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!("Failed to stat {} in S3: {}", key, service_error)))
                }
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        layout::public_url(&self.bucket, &self.region, self.endpoint.as_deref(), key)
    }
}
