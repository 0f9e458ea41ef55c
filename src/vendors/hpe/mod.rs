// src/vendors/hpe/mod.rs

//! HPE firmware packs
//!
//! HPE publishes one SDR repository per server generation
//! (`https://downloads.linux.hpe.com/SDR/repo/fwpp-gen11`). The repository
//! index `current/fwrepodata/fwrepo.json` maps file names to short
//! descriptors; only `.fwpkg` packages are mirrored.
//!
//! A `.fwpkg` is a zip archive whose `payload.json` carries the full
//! description, so conversion can only run after the package was retrieved.

pub mod types;

use self::types::{CatalogEntry, Payload, translated};
use super::http::HttpClient;
use super::{LANGUAGE, push_reboot_notice, push_redfish_markers};
use crate::appstream::{Component, Description, Provide, Release};
use crate::error::{Error, Result};
use crate::vendor::{Catalog, FirmwareEntry, Vendor, VecCatalog, downcast_entry};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Root of the HPE software delivery repositories
pub const HPE_SDR_URL: &str = "https://downloads.linux.hpe.com/SDR/repo";

/// Extension of firmware packages deployable through Redfish
const FWPKG_EXTENSION: &str = ".fwpkg";

/// Package description inside a `.fwpkg`
const PAYLOAD_FILE: &str = "payload.json";

/// HPE SDR repository vendor
pub struct HpeVendor {
    base_url: String,
    client: HttpClient,
}

impl HpeVendor {
    /// Vendor for one repository ("fwpp-gen11")
    pub fn new(repo: &str) -> Result<Self> {
        Ok(Self {
            base_url: format!("{HPE_SDR_URL}/{repo}"),
            client: HttpClient::new()?,
        })
    }

    /// Repository name for a server generation ("gen11" -> "fwpp-gen11")
    pub fn repo_for_generation(generation: &str) -> String {
        format!("fwpp-{generation}")
    }

    /// Point the vendor at another repository root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse `fwrepo.json` and keep the firmware packages, sorted by name
    pub fn entries(&self, raw: &[u8]) -> Result<Vec<HpeFirmwareEntry>> {
        let index: BTreeMap<String, CatalogEntry> =
            serde_json::from_slice(raw).map_err(|e| Error::Catalog(format!("Invalid HPE repository index: {e}")))?;

        Ok(index
            .into_iter()
            .filter(|(filename, _)| filename.ends_with(FWPKG_EXTENSION))
            .map(|(filename, entry)| HpeFirmwareEntry {
                source_url: format!("{}/current/{}", self.base_url, filename),
                filename,
                entry,
                download_path: None,
            })
            .collect())
    }
}

#[async_trait]
impl Vendor for HpeVendor {
    async fn fetch_catalog(&self) -> Result<Box<dyn Catalog>> {
        let url = format!("{}/current/fwrepodata/fwrepo.json", self.base_url);
        info!("Fetching HPE repository index from {}", url);

        let raw = self
            .client
            .get_bytes(&url)
            .await
            .map_err(|e| Error::Catalog(e.to_string()))?;
        let entries = self.entries(&raw)?;
        info!("HPE repository: {} firmware packages", entries.len());
        Ok(Box::new(VecCatalog::new(entries)))
    }

    async fn retrieve_firmware(&self, entry: &mut dyn FirmwareEntry, work_dir: &Path) -> Result<()> {
        let entry = downcast_entry::<HpeFirmwareEntry>(entry, "HPE")?;
        let dest = work_dir.join(&entry.filename);
        if !tokio::fs::try_exists(&dest).await? {
            let url = format!("{}/current/{}", self.base_url, entry.filename);
            self.client.download_to_file(&url, &dest).await?;
        }

        entry.download_path = Some(dest);
        Ok(())
    }
}

/// One HPE firmware package
#[derive(Debug, Clone)]
pub struct HpeFirmwareEntry {
    pub filename: String,
    pub source_url: String,
    pub entry: CatalogEntry,
    /// Set by a successful retrieval
    pub download_path: Option<PathBuf>,
}

impl FirmwareEntry for HpeFirmwareEntry {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn source_url(&self) -> Option<&str> {
        Some(&self.source_url)
    }

    fn to_appstream(&self) -> Result<Component> {
        let path = self.download_path.as_deref().ok_or_else(|| {
            Error::Conversion(format!("{}: firmware must be retrieved before conversion", self.filename))
        })?;

        let payload = read_payload(path)?;
        convert(&payload)
    }
}

/// Read and parse `payload.json` from a `.fwpkg` archive
pub fn read_payload(path: &Path) -> Result<Payload> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Conversion(format!("{} is not a firmware package: {e}", path.display())))?;
    let mut member = archive
        .by_name(PAYLOAD_FILE)
        .map_err(|e| Error::Conversion(format!("{}: {PAYLOAD_FILE}: {e}", path.display())))?;

    let mut raw = String::new();
    member.read_to_string(&mut raw)?;
    serde_json::from_str(&raw).map_err(|e| Error::Conversion(format!("{}: invalid {PAYLOAD_FILE}: {e}", path.display())))
}

fn english<'a>(translations: &'a [types::Translation], field: &str) -> Result<&'a str> {
    translated(translations, LANGUAGE)
        .ok_or_else(|| Error::Conversion(format!("{field}: language not found: {LANGUAGE}")))
}

fn category(key: &str) -> Option<&'static str> {
    match key {
        // Firmware - Network
        "2900095" => Some("X-NetworkInterface"),
        // Firmware - iLO
        "2900213" => Some("X-BaseboardManagementController"),
        _ => None,
    }
}

/// Drop tabs and collapse the double spaces HPE names are padded with
fn clean_summary(summary: &str) -> String {
    summary.replace('\t', "").replace("  ", " ")
}

/// Build the AppStream component for an HPE package
///
/// Every device of a package is assumed to share the version and install
/// duration of the first one.
pub fn convert(payload: &Payload) -> Result<Component> {
    let package = &payload.package;
    let first = payload
        .devices
        .device
        .first()
        .ok_or_else(|| Error::Conversion("HPE package lists no device".to_string()))?;

    let mut devices: Vec<&str> = payload.devices.device.iter().map(|d| d.device_name.as_str()).collect();
    devices.sort_unstable();
    devices.dedup();

    let manufacturer = english(&package.manufacturer_name, "manufacturer_name")?;
    let sw_key = package
        .sw_keys
        .first()
        .ok_or_else(|| Error::Conversion("HPE package has no sw_keys".to_string()))?;
    let id = format!(
        "com.{}.{}",
        manufacturer.replace(' ', "").to_lowercase(),
        sw_key.name.replace(' ', "")
    );

    let mut out = Component::firmware(id, devices.join("/"));
    out.developer_name = Some(manufacturer.to_string());
    out.provides = payload
        .devices
        .device
        .iter()
        .map(|d| Provide::flashed(d.target.clone()))
        .collect();

    if package.installation.reboot_required == "yes" {
        let details = package
            .installation
            .reboot_details
            .first()
            .ok_or_else(|| Error::Conversion("reboot_details: missing".to_string()))?;
        let message = english(&details.language, "reboot_details")?;
        push_reboot_notice(&mut out, message);
    }

    out.summary = clean_summary(english(&package.name, "name")?);
    out.description = Description::paragraph(english(&package.description, "description")?);

    let released = chrono::NaiveDateTime::parse_from_str(&package.release_date, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::Conversion(format!("Invalid HPE release date '{}': {e}", package.release_date)))?;

    let mut release = Release::new(first.version.clone());
    release.date = released.date().format("%Y-%m-%d").to_string();
    release.install_duration = first
        .firmware_images
        .first()
        .map(|image| image.install_duration_sec)
        .unwrap_or(0);
    release.description = out.description.clone();
    out.releases.push(release);

    out.categories = package
        .category
        .iter()
        .filter_map(|c| category(&c.key))
        .map(str::to_string)
        .collect();

    push_redfish_markers(&mut out);
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::appstream::{CUSTOM_DEVICE_FLAGS, CUSTOM_UPDATE_MESSAGE};
    use std::io::{Cursor, Write};

    pub(crate) const SAMPLE_INDEX: &str = r#"{
        "U32_2.10_01_15_2024.fwpkg": {
            "date": "2024-01-15",
            "description": "System ROM",
            "deviceclass": "aa6d0fe0-7ec4-4d5f-8b2c-1a2b3c4d5e6f",
            "reboot_required": "yes",
            "target": ["00000000-0000-0000-0000-000000000204"],
            "version": "2.10_01-15-2024"
        },
        "ilo6_157.fwpkg": {
            "date": "2024-02-01",
            "description": "iLO 6",
            "reboot_required": "no",
            "version": "1.57"
        },
        "cp012345.compsig": { "description": "signature" },
        "cp012345.exe": { "description": "Smart component" }
    }"#;

    pub(crate) const SAMPLE_PAYLOAD: &str = r#"{
        "DeviceClass": "aa6d0fe0-7ec4-4d5f-8b2c-1a2b3c4d5e6f",
        "Devices": {
            "Device": [
                {
                    "DeviceName": "iLO 6",
                    "Target": "c0a1b2c3-d4e5-4f60-8172-839405162738",
                    "Version": "1.57",
                    "FirmwareImages": [
                        { "FileName": "ilo6_157.bin", "InstallDurationSec": 300, "ResetRequired": true }
                    ]
                }
            ]
        },
        "package": {
            "category": [ { "key": "2900213" } ],
            "description": [ { "lang": "en", "x_late": "Upgrades the iLO 6 firmware." } ],
            "installation": {
                "reboot_required": "yes",
                "reboot_details": [ { "language": [ { "lang": "en", "x_late": "Reset iLO to activate." } ] } ]
            },
            "manufacturer_name": [ { "lang": "en", "x_late": "Hewlett Packard Enterprise" } ],
            "name": [ { "lang": "en", "x_late": "Online ROM Flash\tFirmware  for iLO 6" } ],
            "release_date": "2024-02-01T09:30:00",
            "sw_keys": [ { "name": "ilo 6 firmware" } ]
        }
    }"#;

    /// A `.fwpkg` holding `payload.json`
    pub(crate) fn fwpkg(payload: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(PAYLOAD_FILE, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(payload.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn vendor() -> HpeVendor {
        HpeVendor::new("fwpp-gen11").unwrap()
    }

    #[test]
    fn test_repository_url() {
        let v = vendor();
        assert_eq!(v.base_url(), "https://downloads.linux.hpe.com/SDR/repo/fwpp-gen11");
        assert_eq!(HpeVendor::repo_for_generation("gen12"), "fwpp-gen12");
    }

    #[test]
    fn test_entries_keep_fwpkg_sorted() {
        let entries = vendor().entries(SAMPLE_INDEX.as_bytes()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["U32_2.10_01_15_2024.fwpkg", "ilo6_157.fwpkg"]);
        assert_eq!(
            entries[1].source_url,
            "https://downloads.linux.hpe.com/SDR/repo/fwpp-gen11/current/ilo6_157.fwpkg"
        );
        assert_eq!(entries[0].entry.target.len(), 1);
        assert!(entries.iter().all(|e| e.download_path.is_none()));
    }

    #[test]
    fn test_entries_reject_invalid_index() {
        assert!(matches!(vendor().entries(b"[1, 2]"), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_convert_before_retrieval_fails() {
        let entry = vendor().entries(SAMPLE_INDEX.as_bytes()).unwrap().remove(1);
        let err = entry.to_appstream().unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
        assert!(err.to_string().contains("must be retrieved"));
    }

    #[test]
    fn test_convert_from_package() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ilo6_157.fwpkg");
        std::fs::write(&path, fwpkg(SAMPLE_PAYLOAD)).unwrap();

        let mut entry = vendor().entries(SAMPLE_INDEX.as_bytes()).unwrap().remove(1);
        entry.download_path = Some(path);
        let component = entry.to_appstream().unwrap();

        assert_eq!(component.id, "com.hewlettpackardenterprise.ilo6firmware");
        assert_eq!(component.name, "iLO 6");
        assert_eq!(component.developer_name.as_deref(), Some("Hewlett Packard Enterprise"));
        assert_eq!(component.summary, "Online ROM FlashFirmware for iLO 6");
        assert_eq!(component.provides[0].value, "c0a1b2c3-d4e5-4f60-8172-839405162738");
        assert_eq!(component.categories, vec!["X-BaseboardManagementController"]);
        assert_eq!(component.custom_value(CUSTOM_DEVICE_FLAGS), Some("skips-restart"));
        assert_eq!(component.custom_value(CUSTOM_UPDATE_MESSAGE), Some("Reset iLO to activate."));

        let release = &component.releases[0];
        assert_eq!(release.version, "1.57");
        assert_eq!(release.date, "2024-02-01");
        assert_eq!(release.install_duration, 300);
    }

    #[test]
    fn test_convert_invalid_package() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("invalid.fwpkg");
        std::fs::write(&path, b"not a zip file").unwrap();
        assert!(matches!(read_payload(&path), Err(Error::Conversion(_))));

        let empty = temp.path().join("empty.fwpkg");
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::fs::write(&empty, writer.finish().unwrap().into_inner()).unwrap();
        assert!(matches!(read_payload(&empty), Err(Error::Conversion(_))));
    }

    #[test]
    fn test_convert_rejects_bad_date() {
        let mut payload: Payload = serde_json::from_str(SAMPLE_PAYLOAD).unwrap();
        payload.package.release_date = "01/02/2024".to_string();
        assert!(matches!(convert(&payload), Err(Error::Conversion(_))));

        payload.devices.device.clear();
        assert!(matches!(convert(&payload), Err(Error::Conversion(_))));
    }
}
