// src/config.rs
//! Configuration for firmirror
//!
//! [`SyncConfig`] is the immutable value the sync engine runs with. It is
//! built once in `main` from an optional TOML file ([`FileConfig`]) with CLI
//! flags layered on top.
//!
//! File sections:
//! - [sync] - Cache directory, external tool names
//! - [signing] - Certificate and private key for metadata signing
//! - [storage] - Local output directory
//! - [storage.s3] - S3 bucket, prefix, region, endpoint
//! - [vendors.dell] - Dell catalog settings
//! - [vendors.hpe] - HPE repository settings

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default cabinet builder
pub const DEFAULT_CABINET_TOOL: &str = "fwupdtool";

/// Default jcat signer
pub const DEFAULT_JCAT_TOOL: &str = "jcat-tool";

/// HPE generations with a published firmware pack repository
pub const HPE_GENERATIONS: &[&str] = &["gen10", "gen11", "gen12"];

/// Settings consumed by the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Root for per-firmware scratch directories
    pub cache_dir: PathBuf,
    /// Certificate for signing metadata (with `private_key`)
    pub certificate: Option<PathBuf>,
    /// Private key for signing metadata (with `certificate`)
    pub private_key: Option<PathBuf>,
    /// Program used for `build-cabinet`
    pub cabinet_tool: String,
    /// Program used for `self-sign` and `sign`
    pub jcat_tool: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            certificate: None,
            private_key: None,
            cabinet_tool: DEFAULT_CABINET_TOOL.to_string(),
            jcat_tool: DEFAULT_JCAT_TOOL.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Certificate and key, when both are configured
    pub fn signing_credentials(&self) -> Option<(&Path, &Path)> {
        match (&self.certificate, &self.private_key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    /// Scratch directory for one firmware file
    pub fn work_dir(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(format!("{filename}.wrk"))
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".firmirror_cache")
}

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub signing: SigningSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub vendors: VendorsSection,
}

/// [sync] section
#[derive(Debug, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_cabinet_tool")]
    pub cabinet_tool: String,

    #[serde(default = "default_jcat_tool")]
    pub jcat_tool: String,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cabinet_tool: default_cabinet_tool(),
            jcat_tool: default_jcat_tool(),
        }
    }
}

fn default_cabinet_tool() -> String {
    DEFAULT_CABINET_TOOL.to_string()
}

fn default_jcat_tool() -> String {
    DEFAULT_JCAT_TOOL.to_string()
}

/// [signing] section
#[derive(Debug, Default, Deserialize)]
pub struct SigningSection {
    pub certificate: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
}

/// [storage] section
#[derive(Debug, Default, Deserialize)]
pub struct StorageSection {
    /// Local repository directory (ignored when S3 is enabled)
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub s3: S3Section,
}

/// [storage.s3] section
#[derive(Debug, Deserialize)]
pub struct S3Section {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, ...)
    pub endpoint: Option<String>,
}

impl Default for S3Section {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            prefix: String::new(),
            region: default_region(),
            endpoint: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// [vendors] section
#[derive(Debug, Default, Deserialize)]
pub struct VendorsSection {
    #[serde(default)]
    pub dell: DellSection,

    #[serde(default)]
    pub hpe: HpeSection,
}

/// [vendors.dell] section
#[derive(Debug, Default, Deserialize)]
pub struct DellSection {
    #[serde(default)]
    pub enabled: bool,

    /// System IDs to mirror ("0C60"); empty means every system
    #[serde(default)]
    pub machine_ids: Vec<String>,

    /// Catalog host override
    pub base_url: Option<String>,
}

/// [vendors.hpe] section
#[derive(Debug, Deserialize)]
pub struct HpeSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_hpe_gens")]
    pub gens: Vec<String>,

    /// SDR repository root override
    pub base_url: Option<String>,
}

impl Default for HpeSection {
    fn default() -> Self {
        Self {
            enabled: false,
            gens: default_hpe_gens(),
            base_url: None,
        }
    }
}

fn default_hpe_gens() -> Vec<String> {
    HPE_GENERATIONS.iter().map(|g| g.to_string()).collect()
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the merged configuration before a run
    pub fn validate(&self) -> Result<()> {
        if !self.vendors.dell.enabled && !self.vendors.hpe.enabled {
            bail!("No vendor enabled; enable at least one of Dell or HPE");
        }

        if self.vendors.hpe.enabled {
            if self.vendors.hpe.gens.is_empty() {
                bail!("HPE is enabled but no generation is selected");
            }
            for generation in &self.vendors.hpe.gens {
                if !HPE_GENERATIONS.contains(&generation.as_str()) {
                    bail!(
                        "Unknown HPE generation '{}' (expected one of {})",
                        generation,
                        HPE_GENERATIONS.join(", ")
                    );
                }
            }
        }

        let s3 = &self.storage.s3;
        if s3.enabled {
            if s3.bucket.is_empty() {
                bail!("S3 storage is enabled but no bucket is configured");
            }
            if let Some(endpoint) = &s3.endpoint {
                url::Url::parse(endpoint).with_context(|| format!("Invalid S3 endpoint URL: {endpoint}"))?;
            }
        } else if self.storage.output_dir.is_none() {
            bail!("An output directory is required when using local storage");
        }

        match (&self.signing.certificate, &self.signing.private_key) {
            (Some(_), None) => bail!("A signing certificate was given without a private key"),
            (None, Some(_)) => bail!("A signing private key was given without a certificate"),
            _ => {}
        }

        Ok(())
    }

    /// Engine settings derived from this file
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            cache_dir: self.sync.cache_dir.clone(),
            certificate: self.signing.certificate.clone(),
            private_key: self.signing.private_key.clone(),
            cabinet_tool: self.sync.cabinet_tool.clone(),
            jcat_tool: self.sync.jcat_tool.clone(),
        }
    }
}
