// src/vendor.rs

//! Vendor plugin interface
//!
//! A vendor is anything that can list firmware and download it. The sync
//! engine only sees these traits; adding a vendor means implementing them,
//! never touching the engine.
//!
//! The calling sequence for one entry is:
//! 1. [`Catalog::list_entries`] yields the entry
//! 2. [`Vendor::retrieve_firmware`] materializes `work_dir/<filename>`
//! 3. [`FirmwareEntry::to_appstream`] builds the component (may depend on
//!    the downloaded payload)

use crate::appstream::Component;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::any::Any;
use std::path::Path;

/// A firmware source (Dell catalog, HPE SDR repository, ...)
#[async_trait]
pub trait Vendor: Send + Sync {
    /// Download and parse the vendor catalog
    async fn fetch_catalog(&self) -> Result<Box<dyn Catalog>>;

    /// Download the firmware of `entry` into `work_dir/<entry.filename()>`
    ///
    /// Entries are handed back mutably so vendors can record where the
    /// payload landed for the later conversion step.
    async fn retrieve_firmware(&self, entry: &mut dyn FirmwareEntry, work_dir: &Path) -> Result<()>;
}

/// A fetched vendor catalog
pub trait Catalog: Send {
    /// All firmware entries, in a stable order for this fetch
    fn list_entries(&self) -> Vec<Box<dyn FirmwareEntry>>;
}

/// One firmware file published by a vendor
pub trait FirmwareEntry: Any + Send + Sync + 'static {
    /// Canonical file name; also the key of the published-firmware index
    fn filename(&self) -> &str;

    /// Original download URL, recorded as provenance
    fn source_url(&self) -> Option<&str> {
        None
    }

    /// Convert the vendor description into an AppStream component
    fn to_appstream(&self) -> Result<Component>;
}

/// Recover a vendor's concrete entry type
///
/// Fails with [`Error::Vendor`] when the entry belongs to another vendor.
pub fn downcast_entry<'a, T: FirmwareEntry>(entry: &'a mut dyn FirmwareEntry, vendor: &str) -> Result<&'a mut T> {
    let any: &mut dyn Any = entry;
    any.downcast_mut::<T>()
        .ok_or_else(|| Error::Vendor(format!("invalid entry type for {vendor} vendor")))
}

/// Catalog backed by an in-memory list of entries
///
/// `list_entries` needs fresh boxes on every call, so entries are cloned.
pub struct VecCatalog<T> {
    entries: Vec<T>,
}

impl<T> VecCatalog<T> {
    pub fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }
}

impl<T: FirmwareEntry + Clone> Catalog for VecCatalog<T> {
    fn list_entries(&self) -> Vec<Box<dyn FirmwareEntry>> {
        self.entries
            .iter()
            .cloned()
            .map(|e| Box::new(e) as Box<dyn FirmwareEntry>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct AEntry(String);

    impl FirmwareEntry for AEntry {
        fn filename(&self) -> &str {
            &self.0
        }

        fn to_appstream(&self) -> Result<Component> {
            Ok(Component::firmware("com.a.fw", "A"))
        }
    }

    #[derive(Clone)]
    struct BEntry;

    impl FirmwareEntry for BEntry {
        fn filename(&self) -> &str {
            "b.bin"
        }

        fn source_url(&self) -> Option<&str> {
            Some("https://b.example/b.bin")
        }

        fn to_appstream(&self) -> Result<Component> {
            Err(Error::Conversion("no payload".to_string()))
        }
    }

    #[test]
    fn test_downcast_entry() {
        let mut a = AEntry("a.bin".to_string());
        let recovered = downcast_entry::<AEntry>(&mut a, "A").unwrap();
        recovered.0 = "renamed.bin".to_string();
        assert_eq!(a.filename(), "renamed.bin");

        let mut b = BEntry;
        let err = downcast_entry::<AEntry>(&mut b, "A").err().unwrap();
        assert!(err.to_string().contains("invalid entry type for A vendor"));
    }

    #[test]
    fn test_vec_catalog_is_restartable() {
        let catalog = VecCatalog::new(vec![AEntry("1.bin".to_string()), AEntry("2.bin".to_string())]);
        let first: Vec<String> = catalog.list_entries().iter().map(|e| e.filename().to_string()).collect();
        let second: Vec<String> = catalog.list_entries().iter().map(|e| e.filename().to_string()).collect();
        assert_eq!(first, vec!["1.bin", "2.bin"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_source_url_default() {
        assert_eq!(AEntry("a".to_string()).source_url(), None);
        assert_eq!(BEntry.source_url(), Some("https://b.example/b.bin"));
    }
}
