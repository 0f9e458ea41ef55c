// src/sync/metadata.rs

//! Repository metadata reconciliation
//!
//! The published index is `metadata.xml.zst` plus its jcat signature record.
//! Each run loads the previous index, merges the components packaged during
//! the run into it and publishes the result:
//!
//! - components are keyed by identity; a known identity gains the new
//!   releases, never loses old ones
//! - a release already present (same primary checksum filename) is not added
//!   twice
//! - releases without a location point at `<filename>.cab`
//! - output is sorted by identity so unchanged input gives identical bytes

use crate::appstream::{Component, Components, DEFAULT_ORIGIN};
use crate::compression::{self, CompressionFormat};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::storage::{METADATA_KEY, METADATA_SIGNATURE_KEY, Storage};
use crate::tools;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use tracing::{debug, info, warn};

/// Read the published index, or an empty one if nothing was published yet
///
/// An index that exists but cannot be decoded is reported as
/// [`Error::MetadataCorrupted`]; treating it as empty would republish every
/// firmware and drop the previous releases.
pub async fn load(storage: &dyn Storage) -> Result<Components> {
    if !storage.exists(METADATA_KEY).await? {
        info!("No existing metadata in {}, starting fresh", storage.name());
        return Ok(Components::new(DEFAULT_ORIGIN));
    }

    let compressed = storage.read(METADATA_KEY).await?;
    decode(&compressed)
}

/// Decode a compressed index document
pub fn decode(compressed: &[u8]) -> Result<Components> {
    let raw = compression::decompress(compressed, CompressionFormat::Zstd)
        .map_err(|e| Error::MetadataCorrupted(format!("{METADATA_KEY}: {e}")))?;
    let xml = String::from_utf8(raw)
        .map_err(|e| Error::MetadataCorrupted(format!("{METADATA_KEY} is not UTF-8: {e}")))?;
    let mut document =
        Components::from_xml(&xml).map_err(|e| Error::MetadataCorrupted(format!("{METADATA_KEY}: {e}")))?;

    if document.origin.is_empty() {
        document.origin = DEFAULT_ORIGIN.to_string();
    }
    Ok(document)
}

/// Union `incoming` into `target`, skipping releases it already has
fn merge_component(target: &mut Component, incoming: Component) {
    let mut known: HashSet<String> = target
        .releases
        .iter()
        .filter_map(|r| r.primary_filename().map(str::to_string))
        .collect();

    for release in incoming.releases {
        match release.primary_filename() {
            Some(filename) if known.contains(filename) => {
                debug!("{}: release {} already published", target.id, filename);
            }
            Some(filename) => {
                known.insert(filename.to_string());
                target.releases.push(release);
            }
            None => target.releases.push(release),
        }
    }
}

/// Merge pending components into the published index
///
/// Returns a new document sorted by identity, with every release location
/// derived.
pub fn merge(existing: &Components, pending: &[Component]) -> Components {
    let mut by_id: BTreeMap<String, Component> = BTreeMap::new();

    for component in existing.components.iter().chain(pending) {
        match by_id.get_mut(&component.id) {
            Some(target) => merge_component(target, component.clone()),
            None => {
                by_id.insert(component.id.clone(), component.clone());
            }
        }
    }

    let mut components: Vec<Component> = by_id.into_values().collect();
    for release in components.iter_mut().flat_map(|c| c.releases.iter_mut()) {
        release.derive_location();
    }

    let origin = if existing.origin.is_empty() {
        DEFAULT_ORIGIN.to_string()
    } else {
        existing.origin.clone()
    };

    Components { origin, components }
}

/// Compress, sign and upload an index document
///
/// Scratch files live in a temporary directory under the cache directory
/// and are removed however this returns.
pub async fn publish(config: &SyncConfig, storage: &dyn Storage, document: &Components) -> Result<()> {
    let xml = document.to_xml()?;

    tokio::fs::create_dir_all(&config.cache_dir).await?;
    let scratch = tempfile::Builder::new()
        .prefix("metadata.")
        .tempdir_in(&config.cache_dir)?;

    let metadata_path = scratch.path().join(METADATA_KEY);
    let signature_path = scratch.path().join(METADATA_SIGNATURE_KEY);

    let writer = BufWriter::new(File::create(&metadata_path)?);
    compression::compress_zstd(&mut xml.as_bytes(), writer)?;

    tools::jcat_self_sign(&config.jcat_tool, &signature_path, &metadata_path).await?;
    match config.signing_credentials() {
        Some((certificate, private_key)) => {
            tools::jcat_sign(&config.jcat_tool, &signature_path, &metadata_path, certificate, private_key).await?;
            debug!("Signed metadata with {}", certificate.display());
        }
        None => warn!("No signing certificate and key configured, metadata is only self-signed"),
    }

    let metadata = tokio::fs::read(&metadata_path).await?;
    storage.write(METADATA_KEY, &metadata).await?;
    let signature = tokio::fs::read(&signature_path).await?;
    storage.write(METADATA_SIGNATURE_KEY, &signature).await?;

    info!(
        "Published metadata to {} ({} components, {} releases)",
        storage.name(),
        document.components.len(),
        document.release_count()
    );
    Ok(())
}
