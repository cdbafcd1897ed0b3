//! Remote media storage
//!
//! S3-compatible client wrapper for product images. Uploads return the
//! durable public URL that gets persisted on the product record; deletes
//! take the object key derived back out of such a URL.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use shopcore_common::checksum::{compute_bytes_checksum, ChecksumAlgorithm};
use tracing::{debug, info, instrument};

pub mod config;

/// Key prefix for all product images in the bucket
pub const IMAGE_PREFIX: &str = "product-images";

#[derive(Clone)]
pub struct MediaStorage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl MediaStorage {
    pub async fn new(config: config::StorageConfig) -> Result<Self> {
        debug!("Initializing media storage for bucket: {}", config.bucket);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "shopcore-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        let public_base_url = public_base_url(&config);

        info!("Media storage client initialized for bucket: {}", config.bucket);

        Ok(Self {
            client,
            bucket: config.bucket,
            public_base_url,
        })
    }

    /// Upload an object and return its durable public URL
    #[instrument(skip(self, data))]
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<UploadedObject> {
        let checksum = compute_bytes_checksum(&data, ChecksumAlgorithm::Sha256);
        let size = data.len() as i64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.context("Failed to upload to S3")?;

        info!(
            checksum = %checksum,
            size,
            "Successfully uploaded to s3://{}/{}",
            self.bucket,
            key
        );

        Ok(UploadedObject {
            url: self.object_url(key),
            checksum,
            size,
        })
    }

    /// Delete an object by key
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        debug!("Deleting s3://{}/{}", self.bucket, key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context(format!("Failed to delete from S3: {}", key))?;

        info!("Successfully deleted s3://{}/{}", self.bucket, key);

        Ok(())
    }

    /// Object key for a staged image file name
    pub fn key_for(&self, file_name: &str) -> String {
        format!("{}/{}", IMAGE_PREFIX, file_name)
    }

    /// Durable public URL for an object key
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Derive the object key back out of a stored image URL.
    ///
    /// The key is the URL's path from the image prefix onward; URLs that do
    /// not reference the image namespace yield `None`.
    pub fn key_from_url(url: &str) -> Option<String> {
        let marker = format!("/{}/", IMAGE_PREFIX);
        let idx = url.find(&marker)?;
        let key = &url[idx + 1..];
        if key.len() > IMAGE_PREFIX.len() + 1 {
            Some(key.to_string())
        } else {
            None
        }
    }
}

/// Base URL under which stored objects are reachable
fn public_base_url(config: &config::StorageConfig) -> String {
    if let Some(public) = &config.public_url {
        format!("{}/{}", public.trim_end_matches('/'), config.bucket)
    } else if let Some(endpoint) = &config.endpoint {
        format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket)
    } else {
        format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region)
    }
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadedObject {
    pub url: String,
    pub checksum: String,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(config: config::StorageConfig) -> MediaStorage {
        MediaStorage {
            client: Client::from_conf(aws_sdk_s3::Config::builder().build()),
            bucket: config.bucket.clone(),
            public_base_url: public_base_url(&config),
        }
    }

    #[test]
    fn test_key_for() {
        let storage = storage(config::StorageConfig::for_minio(
            "http://localhost:9000",
            "test-bucket",
        ));
        assert_eq!(
            storage.key_for("1700000000-photo.png"),
            "product-images/1700000000-photo.png"
        );
    }

    #[test]
    fn test_object_url_with_endpoint() {
        let storage = storage(config::StorageConfig::for_minio(
            "http://localhost:9000",
            "test-bucket",
        ));
        assert_eq!(
            storage.object_url("product-images/a.png"),
            "http://localhost:9000/test-bucket/product-images/a.png"
        );
    }

    #[test]
    fn test_object_url_without_endpoint() {
        let mut config = config::StorageConfig::for_minio("ignored", "media");
        config.endpoint = None;
        config.public_url = None;
        let storage = storage(config);
        assert_eq!(
            storage.object_url("product-images/a.png"),
            "https://media.s3.us-east-1.amazonaws.com/product-images/a.png"
        );
    }

    #[test]
    fn test_key_from_url_round_trip() {
        let storage = storage(config::StorageConfig::for_minio(
            "http://localhost:9000",
            "test-bucket",
        ));
        let key = storage.key_for("1700000000-photo.png");
        let url = storage.object_url(&key);
        assert_eq!(MediaStorage::key_from_url(&url), Some(key));
    }

    #[test]
    fn test_key_from_url_rejects_foreign_urls() {
        assert_eq!(
            MediaStorage::key_from_url("https://example.com/some/other/path.png"),
            None
        );
        assert_eq!(MediaStorage::key_from_url(""), None);
    }
}
