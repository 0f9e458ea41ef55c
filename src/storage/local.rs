// src/storage/local.rs
//! Local filesystem storage

use super::{validate_key, Storage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Stores artifacts as files directly under a root directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open (and create if needed) a storage root
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            Error::Storage(format!("Failed to create output directory {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to stat {}: {e}", path.display())))
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read {}: {e}", path.display())))
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;

        // Write atomically (write to temp, then rename)
        let temp_path = self.root.join(format!(".{key}.tmp"));
        tokio::fs::write(&temp_path, data)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {e}", temp_path.display())))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::Storage(format!("Failed to move {} into place: {e}", path.display())));
        }

        debug!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    fn name(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
