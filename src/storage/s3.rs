// src/storage/s3.rs
//! S3-compatible object storage
//!
//! Credentials come from the environment (`AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, optionally `AWS_SESSION_TOKEN`). A custom
//! endpoint switches to path-style addressing, which MinIO and most
//! S3-compatible services expect.

use super::{validate_key, Storage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tracing::debug;

/// Connection parameters for [`S3Storage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    /// Optional key prefix ("firmware/lvfs"); empty means bucket root
    pub prefix: String,
    pub region: String,
    /// Custom endpoint URL for S3-compatible services
    pub endpoint: Option<String>,
}

impl S3Settings {
    /// Full object key for an artifact key
    pub fn object_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}/{key}")
        }
    }

    fn region(&self) -> Result<Region> {
        match &self.endpoint {
            Some(endpoint) => Ok(Region::Custom {
                region: self.region.clone(),
                endpoint: endpoint.clone(),
            }),
            None => self
                .region
                .parse::<Region>()
                .map_err(|e| Error::Config(format!("Invalid S3 region '{}': {e}", self.region))),
        }
    }
}

/// Stores artifacts as objects in an S3 bucket
pub struct S3Storage {
    bucket: Box<Bucket>,
    settings: S3Settings,
}

impl S3Storage {
    /// Connect to a bucket using credentials from the environment
    pub fn new(settings: S3Settings) -> Result<Self> {
        if settings.bucket.is_empty() {
            return Err(Error::Config("S3 bucket name is required".to_string()));
        }

        let credentials = Credentials::from_env()
            .map_err(|e| Error::Config(format!("Missing S3 credentials: {e}")))?;
        let region = settings.region()?;

        let mut bucket = Bucket::new(&settings.bucket, region, credentials)
            .map_err(|e| Error::Storage(format!("Failed to open bucket {}: {e}", settings.bucket)))?;
        if settings.endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, settings })
    }

    fn object_key(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        Ok(self.settings.object_key(key))
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl Storage for S3Storage {
    async fn exists(&self, key: &str) -> Result<bool> {
        let object = self.object_key(key)?;
        match self.bucket.head_object(&object).await {
            Ok((_, status)) if is_success(status) => Ok(true),
            Ok((_, 404)) | Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Ok((_, status)) => Err(Error::Storage(format!("HEAD {object} returned HTTP {status}"))),
            Err(e) => Err(Error::Storage(format!("HEAD {object} failed: {e}"))),
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let object = self.object_key(key)?;
        let response = self
            .bucket
            .get_object(&object)
            .await
            .map_err(|e| Error::Storage(format!("GET {object} failed: {e}")))?;

        let status = response.status_code();
        if !is_success(status) {
            return Err(Error::Storage(format!("GET {object} returned HTTP {status}")));
        }
        Ok(response.bytes().to_vec())
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let object = self.object_key(key)?;
        let response = self
            .bucket
            .put_object(&object, data)
            .await
            .map_err(|e| Error::Storage(format!("PUT {object} failed: {e}")))?;

        let status = response.status_code();
        if !is_success(status) {
            return Err(Error::Storage(format!("PUT {object} returned HTTP {status}")));
        }

        debug!("Uploaded s3://{}/{} ({} bytes)", self.settings.bucket, object, data.len());
        Ok(())
    }

    fn name(&self) -> String {
        format!("s3://{}/{}", self.settings.bucket, self.settings.prefix.trim_matches('/'))
    }
}
