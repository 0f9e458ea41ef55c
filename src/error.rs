// src/error.rs

//! Error types for firmirror
//!
//! Variants follow the failure classes of a sync run:
//! - vendor level (`Catalog`): the vendor is skipped for this run
//! - entry level (`Download`, `Conversion`, `Tool`, `Storage`, ...): only the
//!   firmware entry is skipped
//! - metadata level (`MetadataCorrupted`, `MetadataPublish`): the run fails

use std::io;
use thiserror::Error;

use crate::compression::CompressionError;

#[derive(Error, Debug)]
pub enum Error {
    /// Vendor catalog could not be fetched or parsed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Firmware or catalog download failed
    #[error("Download error: {0}")]
    Download(String),

    /// Vendor descriptor could not be turned into an AppStream component
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Vendor received an entry it does not understand
    #[error("Vendor error: {0}")]
    Vendor(String),

    /// External tool failed to start or exited non-zero
    #[error("{tool} failed: {message}\nOutput: {output}")]
    Tool {
        tool: String,
        message: String,
        output: String,
    },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// XML encoding or decoding failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Published metadata exists but cannot be decoded
    #[error("Existing metadata is corrupted: {0}")]
    MetadataCorrupted(String),

    /// New metadata could not be published
    #[error("Failed to publish metadata: {0}")]
    MetadataPublish(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
