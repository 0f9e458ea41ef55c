// src/cli.rs
//! CLI definitions for firmirror
//!
//! Flags are grouped per concern (Dell, HPE, S3, signing) and layered over
//! the optional `--config` file: a flag given on the command line always
//! wins over the file.

use crate::config::{FileConfig, HPE_GENERATIONS};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "firmirror")]
#[command(author = "Firmirror Contributors")]
#[command(version)]
#[command(about = "Mirror vendor firmware into an LVFS-compatible repository", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh all the firmware from the vendor repositories
    ///
    /// Firmware already in the repository is never replaced, even if the
    /// vendor pushed an updated file under the same name; delete it from
    /// the repository to fetch it again.
    Refresh(RefreshArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct RefreshArgs {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for the repository (ignored when using S3)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Directory for temporary per-firmware work files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    #[command(flatten)]
    pub dell: DellArgs,

    #[command(flatten)]
    pub hpe: HpeArgs,

    #[command(flatten)]
    pub s3: S3Args,

    #[command(flatten)]
    pub sign: SignArgs,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Dell")]
pub struct DellArgs {
    /// Enable Dell firmware fetching
    #[arg(id = "dell_enable", long = "dell-enable")]
    pub enable: bool,

    /// System IDs to fetch firmware for ("0C60" for the C6615 series);
    /// "*" fetches every firmware, which takes a very long time
    #[arg(long = "dell-machines-id", value_delimiter = ',', value_name = "ID")]
    pub machines_id: Vec<String>,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "HPE")]
pub struct HpeArgs {
    /// Enable HPE firmware fetching
    #[arg(id = "hpe_enable", long = "hpe-enable")]
    pub enable: bool,

    /// Server generations to fetch firmware for [default: gen10,gen11,gen12]
    #[arg(
        long = "hpe-gens",
        value_delimiter = ',',
        value_name = "GEN",
        value_parser = clap::builder::PossibleValuesParser::new(HPE_GENERATIONS.iter().copied())
    )]
    pub gens: Vec<String>,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "S3 Storage")]
pub struct S3Args {
    /// Use the S3 backend instead of the local filesystem; requires
    /// AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY
    #[arg(id = "s3_enable", long = "s3-enable")]
    pub enable: bool,

    /// Bucket for the repository files
    #[arg(long = "s3-bucket")]
    pub bucket: Option<String>,

    /// Prefix for all object keys
    #[arg(long = "s3-prefix")]
    pub prefix: Option<String>,

    /// AWS region [default: us-east-1]
    #[arg(long = "s3-region")]
    pub region: Option<String>,

    /// Custom endpoint URL for S3-compatible services (MinIO, ...)
    #[arg(long = "s3-endpoint")]
    pub endpoint: Option<String>,
}

#[derive(Args, Debug, Default)]
#[command(next_help_heading = "Signature")]
pub struct SignArgs {
    /// Certificate for signing metadata (.pem or .crt)
    #[arg(long = "sign-certificate")]
    pub certificate: Option<PathBuf>,

    /// Private key for signing metadata (.pem or .key)
    #[arg(long = "sign-private-key")]
    pub private_key: Option<PathBuf>,
}

impl RefreshArgs {
    /// Layer the command-line flags over a configuration file
    pub fn apply(&self, config: &mut FileConfig) {
        if let Some(dir) = &self.output_dir {
            config.storage.output_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.cache_dir {
            config.sync.cache_dir = dir.clone();
        }

        let dell = &mut config.vendors.dell;
        dell.enabled |= self.dell.enable;
        if !self.dell.machines_id.is_empty() {
            dell.machine_ids = self.dell.machines_id.clone();
        }

        let hpe = &mut config.vendors.hpe;
        hpe.enabled |= self.hpe.enable;
        if !self.hpe.gens.is_empty() {
            hpe.gens = self.hpe.gens.clone();
        }

        let s3 = &mut config.storage.s3;
        s3.enabled |= self.s3.enable;
        if let Some(bucket) = &self.s3.bucket {
            s3.bucket = bucket.clone();
        }
        if let Some(prefix) = &self.s3.prefix {
            s3.prefix = prefix.clone();
        }
        if let Some(region) = &self.s3.region {
            s3.region = region.clone();
        }
        if let Some(endpoint) = &self.s3.endpoint {
            s3.endpoint = Some(endpoint.clone()).filter(|e| !e.is_empty());
        }

        if let Some(certificate) = &self.sign.certificate {
            config.signing.certificate = Some(certificate.clone());
        }
        if let Some(private_key) = &self.sign.private_key {
            config.signing.private_key = Some(private_key.clone());
        }
    }
}
