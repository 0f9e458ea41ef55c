// src/storage/mod.rs
//! Artifact storage backends
//!
//! The repository is a flat namespace of artifacts addressed by key:
//! - `metadata.xml.zst` - compressed AppStream index
//! - `metadata.xml.zst.jcat` - detached signature/checksum record
//! - `<firmware>.cab` - one cabinet per published release
//!
//! Backends:
//! - [`LocalStorage`]: a directory on the local filesystem
//! - [`S3Storage`]: an S3-compatible bucket (AWS, MinIO, R2, ...)

mod local;
mod s3;

pub use local::LocalStorage;
pub use s3::{S3Settings, S3Storage};

use crate::error::{Error, Result};
use async_trait::async_trait;

/// Key of the compressed metadata index
pub const METADATA_KEY: &str = "metadata.xml.zst";

/// Key of the signature record covering [`METADATA_KEY`]
pub const METADATA_SIGNATURE_KEY: &str = "metadata.xml.zst.jcat";

/// Key/blob persistence used by the sync engine
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check whether an artifact exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read an artifact fully
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Create or replace an artifact
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Human-readable backend description (for logging)
    fn name(&self) -> String;
}

/// Reject keys that would escape the flat artifact namespace
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(Error::Storage(format!("Invalid storage key: {key:?}")));
    }
    Ok(())
}
