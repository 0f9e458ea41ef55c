// src/sync/mod.rs

//! Firmware synchronization engine
//!
//! [`FirmwareSyncer`] drives a run:
//! 1. `load_metadata` reads the published index and rebuilds the membership
//!    index from it
//! 2. `run` (or `process_vendor`) walks every registered vendor catalog and
//!    packages each firmware not published yet
//! 3. `save_metadata` merges what was packaged into the index and publishes
//!    it
//!
//! Failures are contained at the smallest level that makes sense: a broken
//! firmware entry is counted and skipped, a broken catalog skips its vendor,
//! and only metadata load/publish failures stop the run.

pub mod index;
pub mod metadata;
pub mod package;

pub use index::MembershipIndex;

use crate::appstream::{Component, Components, DEFAULT_ORIGIN, Url};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::vendor::{FirmwareEntry, Vendor};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Outcome of one vendor pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorReport {
    pub vendor: String,
    /// Packaged and queued for publication
    pub processed: usize,
    /// Already published
    pub skipped: usize,
    /// Failed to download, convert or package
    pub failed: usize,
    /// Entries in the catalog
    pub total: usize,
    /// Walk stopped early on cancellation; the counts cover the entries
    /// handled before that
    pub cancelled: bool,
}

impl fmt::Display for VendorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} skipped, {} failed, {} total",
            self.vendor, self.processed, self.skipped, self.failed, self.total
        )?;
        if self.cancelled {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Vendors whose catalog was walked
    pub reports: Vec<VendorReport>,
    /// Vendors skipped because of an error, with the error message
    pub failed_vendors: Vec<(String, String)>,
    /// Run stopped early on cancellation
    pub cancelled: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.reports.iter().map(|r| r.processed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }
}

/// Owns the per-run state: vendor registry, membership index, loaded
/// metadata and components packaged so far
pub struct FirmwareSyncer {
    config: SyncConfig,
    storage: Arc<dyn Storage>,
    vendors: Vec<(String, Arc<dyn Vendor>)>,
    metadata: Components,
    index: MembershipIndex,
    pending: Vec<Component>,
}

impl FirmwareSyncer {
    pub fn new(config: SyncConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            config,
            storage,
            vendors: Vec::new(),
            metadata: Components::new(DEFAULT_ORIGIN),
            index: MembershipIndex::new(),
            pending: Vec::new(),
        }
    }

    /// Register a vendor; vendors run in registration order
    ///
    /// Registering a name twice replaces the earlier vendor in place.
    pub fn register_vendor(&mut self, name: impl Into<String>, vendor: Arc<dyn Vendor>) {
        let name = name.into();
        match self.vendors.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                warn!("Vendor {} registered twice, replacing", name);
                slot.1 = vendor;
            }
            None => self.vendors.push((name, vendor)),
        }
    }

    /// Names of the registered vendors, in run order
    pub fn vendors(&self) -> Vec<&str> {
        self.vendors.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Published index as last loaded or saved
    pub fn metadata(&self) -> &Components {
        &self.metadata
    }

    pub fn index(&self) -> &MembershipIndex {
        &self.index
    }

    /// Components packaged in this run and not yet published
    pub fn pending(&self) -> &[Component] {
        &self.pending
    }

    /// Load the published index and rebuild the membership index
    pub async fn load_metadata(&mut self) -> Result<()> {
        let document = metadata::load(self.storage.as_ref()).await?;
        self.index = MembershipIndex::from_components(&document);
        info!(
            "Loaded metadata: {} components, {} published firmware files",
            document.components.len(),
            self.index.len()
        );
        self.metadata = document;
        Ok(())
    }

    /// Merge pending components into the index and publish it
    ///
    /// Returns false without touching storage when nothing is pending.
    /// Runs to completion even after cancellation so finished work is kept.
    pub async fn save_metadata(&mut self) -> Result<bool> {
        if self.pending.is_empty() {
            info!("No new firmware, metadata left unchanged");
            return Ok(false);
        }

        let merged = metadata::merge(&self.metadata, &self.pending);
        metadata::publish(&self.config, self.storage.as_ref(), &merged)
            .await
            .map_err(|e| match e {
                Error::MetadataPublish(_) => e,
                other => Error::MetadataPublish(other.to_string()),
            })?;

        self.index.extend_from(&merged);
        self.metadata = merged;
        self.pending.clear();
        Ok(true)
    }

    /// Process every registered vendor in order
    ///
    /// Catalog failures are recorded and the next vendor runs. Cancellation
    /// stops the loop; components packaged so far stay pending and the
    /// interrupted vendor's partial report is kept.
    pub async fn run(&mut self, cancel: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary::default();
        let vendors = self.vendors.clone();
        info!("Starting firmware processing for {} vendors", vendors.len());

        for (name, vendor) in vendors {
            if cancel.is_cancelled() {
                info!("Shutdown requested, stopping processing");
                summary.cancelled = true;
                break;
            }

            info!("Processing vendor {}", name);
            match self.process_vendor(&name, vendor.as_ref(), cancel).await {
                Ok(report) if report.cancelled => {
                    info!("Shutdown requested during {}, stopping processing", name);
                    summary.reports.push(report);
                    summary.cancelled = true;
                    break;
                }
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!("Failed to process vendor {}: {}", name, e);
                    summary.failed_vendors.push((name, e.to_string()));
                }
            }
        }

        summary
    }

    /// Walk one vendor catalog and package every unpublished entry
    ///
    /// On cancellation the walk stops before the next entry and the report
    /// comes back with `cancelled` set.
    pub async fn process_vendor(
        &mut self,
        name: &str,
        vendor: &dyn Vendor,
        cancel: &CancellationToken,
    ) -> Result<VendorReport> {
        let catalog = vendor.fetch_catalog().await.map_err(|e| {
            error!("{}: failed to fetch catalog: {}", name, e);
            match e {
                Error::Catalog(_) => e,
                other => Error::Catalog(other.to_string()),
            }
        })?;

        let entries = catalog.list_entries();
        let mut report = VendorReport {
            vendor: name.to_string(),
            total: entries.len(),
            ..Default::default()
        };
        info!("{}: {} firmware entries in catalog", name, report.total);

        for mut entry in entries {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let filename = entry.filename().to_string();
            if self.index.contains(&filename) {
                report.skipped += 1;
                continue;
            }

            let work_dir = self.config.work_dir(&filename);
            let outcome = match tokio::fs::create_dir_all(&work_dir).await {
                Ok(()) => self.process_entry(vendor, entry.as_mut(), &work_dir).await,
                Err(e) => Err(Error::Io(e)),
            };
            remove_work_dir(&work_dir).await;

            match outcome {
                Ok(component) => {
                    info!("{}: packaged {}", name, filename);
                    self.index.insert(filename);
                    self.pending.push(component);
                    report.processed += 1;
                }
                Err(e) => {
                    error!("{}: failed to process {}: {}", name, filename, e);
                    report.failed += 1;
                }
            }
        }

        info!("{}", report);
        Ok(report)
    }

    /// Download, convert and package a single entry inside `work_dir`
    async fn process_entry(
        &self,
        vendor: &dyn Vendor,
        entry: &mut dyn FirmwareEntry,
        work_dir: &Path,
    ) -> Result<Component> {
        vendor.retrieve_firmware(entry, work_dir).await?;

        let mut component = entry.to_appstream()?;
        if let Some(url) = entry.source_url() {
            component.url = Some(Url::homepage(url));
        }

        package::assemble(
            &self.config,
            self.storage.as_ref(),
            work_dir,
            entry.filename(),
            &mut component,
        )
        .await?;

        Ok(component)
    }
}

async fn remove_work_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
