// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! The packaging and signing tools are replaced by small shell scripts so a
//! whole sync run can execute without fwupd installed.

#![allow(dead_code)]

use async_trait::async_trait;
use firmirror::appstream::{Component, Release};
use firmirror::storage::{LocalStorage, Storage};
use firmirror::vendor::{Catalog, FirmwareEntry, VecCatalog, Vendor, downcast_entry};
use firmirror::{Error, FirmwareSyncer, Result, SyncConfig};
use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Stand-in for `fwupdtool build-cabinet <cab> <metainfo> <blob>`
const CABINET_SCRIPT: &str = r#"#!/bin/sh
[ "$1" = "build-cabinet" ] || exit 2
cat "$4" "$3" > "$2"
"#;

/// Stand-in for `jcat-tool self-sign|sign <sig> <file> ...`
const JCAT_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  self-sign) echo "sha256 $3" >> "$2" ;;
  sign) echo "pkcs7 $3" >> "$2" ;;
  *) exit 2 ;;
esac
"#;

const FAILING_SCRIPT: &str = r#"#!/bin/sh
echo "simulated failure" >&2
exit 1
"#;

/// Write an executable script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Scratch layout for one test: stub tools, a cache dir and an output dir
pub struct Harness {
    pub temp: TempDir,
    pub config: SyncConfig,
    pub output: PathBuf,
}

impl Harness {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let bin = temp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();

        let cabinet = write_script(&bin, "fake-fwupdtool", CABINET_SCRIPT);
        let jcat = write_script(&bin, "fake-jcat-tool", JCAT_SCRIPT);

        let mut config = SyncConfig::new(temp.path().join("cache"));
        config.cabinet_tool = cabinet.to_string_lossy().into_owned();
        config.jcat_tool = jcat.to_string_lossy().into_owned();

        let output = temp.path().join("out");
        Self { temp, config, output }
    }

    /// Replace the signing tool with one that always fails
    pub fn with_failing_jcat(mut self) -> Self {
        let bin = self.temp.path().join("bin");
        let failing = write_script(&bin, "failing-jcat-tool", FAILING_SCRIPT);
        self.config.jcat_tool = failing.to_string_lossy().into_owned();
        self
    }

    /// Replace the cabinet tool with one that always fails
    pub fn with_failing_cabinet_tool(mut self) -> Self {
        let bin = self.temp.path().join("bin");
        let failing = write_script(&bin, "failing-fwupdtool", FAILING_SCRIPT);
        self.config.cabinet_tool = failing.to_string_lossy().into_owned();
        self
    }

    pub fn storage(&self) -> Arc<LocalStorage> {
        Arc::new(LocalStorage::new(&self.output).unwrap())
    }

    pub fn syncer(&self) -> FirmwareSyncer {
        FirmwareSyncer::new(self.config.clone(), self.storage())
    }

    /// Artifacts present in the output directory, sorted
    pub fn artifacts(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output)
            .map(|dir| {
                dir.filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Work directories left behind in the cache
    pub fn leftover_work_dirs(&self) -> Vec<String> {
        std::fs::read_dir(&self.config.cache_dir)
            .map(|dir| {
                dir.filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| name.ends_with(".wrk"))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Firmware entry of [`MockVendor`]
#[derive(Clone, Debug)]
pub struct MockEntry {
    pub filename: String,
    pub component_id: String,
    pub version: String,
    pub payload: Vec<u8>,
    pub fail_conversion: bool,
}

impl MockEntry {
    pub fn new(filename: &str, component_id: &str, version: &str) -> Self {
        Self {
            filename: filename.to_string(),
            component_id: component_id.to_string(),
            version: version.to_string(),
            payload: format!("firmware {filename} {version}").into_bytes(),
            fail_conversion: false,
        }
    }

    /// Make `to_appstream` reject this entry
    pub fn failing_conversion(mut self) -> Self {
        self.fail_conversion = true;
        self
    }
}

impl FirmwareEntry for MockEntry {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn source_url(&self) -> Option<&str> {
        Some("https://firmware.example/downloads")
    }

    fn to_appstream(&self) -> Result<Component> {
        if self.fail_conversion {
            return Err(Error::Conversion(format!("{}: missing device GUID", self.filename)));
        }
        let mut component = Component::firmware(&self.component_id, format!("Mock {}", self.component_id));
        component.summary = "Mock firmware".to_string();
        component.developer_name = Some("Mock".to_string());
        let mut release = Release::new(&self.version);
        release.date = "2024-01-01".to_string();
        component.releases.push(release);
        Ok(component)
    }
}

/// Vendor serving a fixed list of entries from memory
#[derive(Default)]
pub struct MockVendor {
    entries: Vec<MockEntry>,
    failing: HashSet<String>,
    catalog_error: bool,
    retrieved: Arc<Mutex<Vec<String>>>,
}

impl MockVendor {
    pub fn new(entries: Vec<MockEntry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    /// Make the download of `filename` fail
    pub fn failing_on(mut self, filename: &str) -> Self {
        self.failing.insert(filename.to_string());
        self
    }

    /// Make the catalog fetch fail
    pub fn broken_catalog() -> Self {
        Self {
            catalog_error: true,
            ..Default::default()
        }
    }

    /// Shared log of the file names `retrieve_firmware` was called with
    pub fn retrieved(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.retrieved)
    }
}

#[async_trait]
impl Vendor for MockVendor {
    async fn fetch_catalog(&self) -> Result<Box<dyn Catalog>> {
        if self.catalog_error {
            return Err(Error::Download("catalog unavailable".to_string()));
        }
        Ok(Box::new(VecCatalog::new(self.entries.clone())))
    }

    async fn retrieve_firmware(&self, entry: &mut dyn FirmwareEntry, work_dir: &Path) -> Result<()> {
        let entry = downcast_entry::<MockEntry>(entry, "Mock")?;
        self.retrieved.lock().unwrap().push(entry.filename.clone());

        if self.failing.contains(&entry.filename) {
            return Err(Error::Download(format!("{}: HTTP 404", entry.filename)));
        }
        tokio::fs::write(work_dir.join(&entry.filename), &entry.payload).await?;
        Ok(())
    }
}

/// Storage that reads through to an inner backend but rejects writes
pub struct ReadOnlyStorage<S> {
    pub inner: S,
}

#[async_trait]
impl<S: Storage> Storage for ReadOnlyStorage<S> {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, _data: &[u8]) -> Result<()> {
        Err(Error::Storage(format!("{key}: read-only storage")))
    }

    fn name(&self) -> String {
        format!("read-only {}", self.inner.name())
    }
}
