// src/hash.rs

//! Firmware checksums
//!
//! fwupd clients verify a release against the checksums listed in the
//! metadata. Two algorithms are published for every firmware blob:
//! - **SHA-1**: legacy, still read by older fwupd releases
//! - **SHA-256**: used by current clients
//!
//! Both digests are computed in a single pass over the data.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Buffer size for streaming file hashing
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Hash algorithm published in a `<checksum type="...">` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256 (256-bit)
    Sha256,
}

/// Digests of one firmware blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareDigests {
    /// Lowercase hex SHA-1
    pub sha1: String,
    /// Lowercase hex SHA-256
    pub sha256: String,
}

impl FirmwareDigests {
    /// Compute both digests from a reader in one pass
    pub fn from_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            sha1.update(&buffer[..n]);
            sha256.update(&buffer[..n]);
        }

        Ok(Self {
            sha1: format!("{:x}", sha1.finalize()),
            sha256: format!("{:x}", sha256.finalize()),
        })
    }

    /// Compute both digests of a file, streaming its content
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        Self::from_reader(&mut file)
    }

    /// Compute both digests of an in-memory buffer
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            sha1: format!("{:x}", Sha1::digest(data)),
            sha256: format!("{:x}", Sha256::digest(data)),
        }
    }

    /// Get the digest for one algorithm
    pub fn get(&self, algorithm: HashAlgorithm) -> &str {
        match algorithm {
            HashAlgorithm::Sha1 => &self.sha1,
            HashAlgorithm::Sha256 => &self.sha256,
        }
    }
}
