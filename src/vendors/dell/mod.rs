// src/vendors/dell/mod.rs

//! Dell enterprise firmware
//!
//! Dell publishes one catalog for every server platform at
//! `https://dl.dell.com/catalog/catalog.xml.gz`: gzip-compressed, UTF-16LE
//! XML. Only `FRMW` packages are mirrored, optionally limited to a set of
//! system IDs.
//!
//! Component identities are name-based UUIDv5s so the same package name maps
//! to the same component across catalog revisions, and device GUIDs follow
//! the Redfish instance ID scheme fwupd uses for Dell servers.

pub mod types;

use self::types::{DellManifest, SoftwareComponent};
use super::http::HttpClient;
use super::{LANGUAGE, push_reboot_notice, push_redfish_markers};
use crate::appstream::{Component, Description, Provide, Release, Urgency};
use crate::compression::{self, CompressionFormat};
use crate::error::{Error, Result};
use crate::vendor::{Catalog, FirmwareEntry, Vendor, VecCatalog, downcast_entry};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Dell download host
pub const DELL_BASE_URL: &str = "https://dl.dell.com";

/// Catalog location relative to the download host
pub const CATALOG_PATH: &str = "catalog/catalog.xml.gz";

/// Component type of firmware packages (as opposed to drivers or apps)
const FIRMWARE_COMPONENT_TYPE: &str = "FRMW";

/// Dell catalog vendor
pub struct DellVendor {
    base_url: String,
    system_ids: Vec<String>,
    client: HttpClient,
}

impl DellVendor {
    /// Mirror firmware for `system_ids`; empty (or `*`) means every system
    pub fn new(system_ids: Vec<String>) -> Result<Self> {
        Ok(Self {
            base_url: DELL_BASE_URL.to_string(),
            system_ids,
            client: HttpClient::new()?,
        })
    }

    /// Point the vendor at another download host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    fn wants(&self, component: &SoftwareComponent) -> bool {
        if component.component_type.value != FIRMWARE_COMPONENT_TYPE {
            return false;
        }
        if self.system_ids.is_empty() || self.system_ids.iter().any(|s| s == "*") {
            return true;
        }
        component
            .system_ids()
            .any(|id| self.system_ids.iter().any(|wanted| wanted.eq_ignore_ascii_case(id)))
    }

    /// Keep the firmware packages this vendor mirrors, as catalog entries
    pub fn entries(&self, manifest: DellManifest) -> Vec<DellFirmwareEntry> {
        let base_location = match manifest.base_location.as_str() {
            "" => self.base_url.clone(),
            loc if loc.contains("://") => loc.trim_end_matches('/').to_string(),
            loc => format!("https://{}", loc.trim_end_matches('/')),
        };

        manifest
            .components
            .into_iter()
            .filter(|c| self.wants(c))
            .filter_map(|component| {
                let filename = basename(&component.path)?.to_string();
                let source_url = format!("{}/{}", base_location, component.path);
                Some(DellFirmwareEntry {
                    filename,
                    source_url,
                    component: Arc::new(component),
                })
            })
            .collect()
    }
}

/// Last path segment of a catalog path (`FOLDER/1/BIOS.EXE` -> `BIOS.EXE`)
fn basename(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\']).next().filter(|name| !name.is_empty())
}

/// Decode a raw (decompressed) catalog document
///
/// The catalog is UTF-16; a byte-order mark wins over the little-endian
/// default. The XML declaration still claims UTF-16 after transcoding, so it
/// is dropped before parsing.
pub fn parse_catalog(raw: &[u8]) -> Result<DellManifest> {
    let (text, _, had_errors) = encoding_rs::UTF_16LE.decode(raw);
    if had_errors {
        return Err(Error::Catalog("Dell catalog is not valid UTF-16".to_string()));
    }

    let body = match text.trim_start().strip_prefix("<?xml") {
        Some(rest) => rest.split_once("?>").map(|(_, body)| body).unwrap_or(rest),
        None => text.as_ref(),
    };

    quick_xml::de::from_str(body).map_err(|e| Error::Catalog(format!("Invalid Dell catalog: {e}")))
}

#[async_trait]
impl Vendor for DellVendor {
    async fn fetch_catalog(&self) -> Result<Box<dyn Catalog>> {
        let url = format!("{}/{}", self.base_url, CATALOG_PATH);
        info!("Fetching Dell catalog from {}", url);

        let compressed = self
            .client
            .get_bytes(&url)
            .await
            .map_err(|e| Error::Catalog(e.to_string()))?;
        let raw = compression::decompress(&compressed, CompressionFormat::Gzip)
            .map_err(|e| Error::Catalog(format!("Dell catalog: {e}")))?;
        let manifest = parse_catalog(&raw)?;
        debug!(
            "Dell catalog {} lists {} packages",
            manifest.version,
            manifest.components.len()
        );

        let entries = self.entries(manifest);
        info!("Dell catalog: {} firmware packages selected", entries.len());
        Ok(Box::new(VecCatalog::new(entries)))
    }

    async fn retrieve_firmware(&self, entry: &mut dyn FirmwareEntry, work_dir: &Path) -> Result<()> {
        let entry = downcast_entry::<DellFirmwareEntry>(entry, "Dell")?;
        let dest = work_dir.join(&entry.filename);
        if tokio::fs::try_exists(&dest).await? {
            return Ok(());
        }

        let url = format!("{}/{}", self.base_url, entry.component.path);
        self.client.download_to_file(&url, &dest).await?;
        Ok(())
    }
}

/// One Dell firmware package
#[derive(Debug, Clone)]
pub struct DellFirmwareEntry {
    pub filename: String,
    pub source_url: String,
    pub component: Arc<SoftwareComponent>,
}

impl FirmwareEntry for DellFirmwareEntry {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn source_url(&self) -> Option<&str> {
        Some(&self.source_url)
    }

    fn to_appstream(&self) -> Result<Component> {
        convert(&self.component)
    }
}

fn english<'a>(text: &'a types::Translatable, field: &str) -> Result<&'a str> {
    text.get(LANGUAGE)
        .ok_or_else(|| Error::Conversion(format!("{field}: language not found: {LANGUAGE}")))
}

fn urgency(criticality: i64) -> Urgency {
    match criticality {
        2 => Urgency::Critical,
        3 => Urgency::Low,
        _ => Urgency::Medium,
    }
}

fn category(lu_category: &str) -> Option<&'static str> {
    match lu_category {
        "BIOS" => Some("X-System"),
        "Serial ATA" | "SAS Drive" => Some("X-Drive"),
        "Express Flash PCIe SSD" => Some("X-SolidStateDrive"),
        "Network" => Some("X-NetworkInterface"),
        "Chassis System Management" => Some("X-Controller"),
        "iDRAC with Lifecycle Controller" => Some("X-BaseboardManagementController"),
        _ => None,
    }
}

/// Release date (`YYYY-MM-DD`) from the package timestamp
fn release_date(date_time: &str) -> Result<String> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(date_time) {
        return Ok(parsed.date_naive().format("%Y-%m-%d").to_string());
    }
    chrono::NaiveDateTime::parse_from_str(date_time, "%Y-%m-%dT%H:%M:%S")
        .map(|parsed| parsed.date().format("%Y-%m-%d").to_string())
        .map_err(|e| Error::Conversion(format!("Invalid Dell package date '{date_time}': {e}")))
}

/// Build the AppStream component for a Dell package
pub fn convert(fw: &SoftwareComponent) -> Result<Component> {
    let name = fw.name.get(LANGUAGE).unwrap_or_default().to_string();
    let id = format!("com.dell.{}", Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()));
    let mut out = Component::firmware(id, name);
    out.developer_name = Some("Dell".to_string());

    for system_id in fw.system_ids() {
        for device in &fw.supported_devices.devices {
            let instance_id = format!(
                "REDFISH\\VENDOR_Dell&SYSTEMID_{}&SOFTWAREID_{}",
                system_id, device.component_id
            );
            let guid = Uuid::new_v5(&Uuid::NAMESPACE_DNS, instance_id.as_bytes());
            out.provides.push(Provide::flashed(guid.to_string()));
        }
    }

    if fw.reboot_required {
        let message = english(&fw.important_info, "ImportantInfo")?;
        push_reboot_notice(&mut out, message);
    }

    let summary = english(&fw.description, "Description")?;
    out.summary = summary.to_string();
    out.description = Description::paragraph(summary);

    let mut release = Release::new(fw.vendor_version.clone());
    release.date = release_date(&fw.date_time)?;
    release.urgency = Some(urgency(fw.criticality.value));
    release.description = out.description.clone();
    out.releases.push(release);

    if let Some(category) = category(&fw.lu_category.value) {
        out.categories.push(category.to_string());
    }

    push_redfish_markers(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appstream::{CUSTOM_DEVICE_FLAGS, CUSTOM_UPDATE_MESSAGE, CUSTOM_UPDATE_PROTOCOL};

    pub(crate) const SAMPLE_CATALOG: &str = r#"<?xml version="1.0" encoding="utf-16"?>
<Manifest baseLocation="downloads.dell.com" dateTime="2024-05-01T10:00:00+00:00" version="24.05.00">
  <SoftwareBundle bundleID="B1" path="FOLDER0/bundle.xml">
    <Name><Display lang="en">Bundle</Display></Name>
  </SoftwareBundle>
  <SoftwareComponent dateTime="2024-04-15T08:30:00+05:30" packageID="ABC12" path="FOLDER1/1/BIOS_ABC12_WN64_2.1.0.EXE" rebootRequired="true" vendorVersion="2.1.0">
    <Name><Display lang="en"><![CDATA[PowerEdge C6615 BIOS]]></Display></Name>
    <ComponentType value="FRMW"><Display lang="en">Firmware</Display></ComponentType>
    <Description><Display lang="en">This release adds support for new processors.</Display></Description>
    <LUCategory value="BIOS"><Display lang="en">BIOS</Display></LUCategory>
    <Category value="BI"><Display lang="en">BIOS</Display></Category>
    <ImportantInfo URL="https://www.dell.com"><Display lang="en">Reboot the server to apply.</Display></ImportantInfo>
    <SupportedDevices>
      <Device componentID="159" embedded="1"><Display lang="en">BIOS</Display></Device>
    </SupportedDevices>
    <SupportedSystems>
      <Brand key="3" prefix="PE">
        <Display lang="en">PowerEdge</Display>
        <Model systemID="0C60" systemIDType="BIOS"><Display lang="en">C6615</Display></Model>
      </Brand>
    </SupportedSystems>
    <Criticality value="2"><Display lang="en">Urgent</Display></Criticality>
  </SoftwareComponent>
  <SoftwareComponent dateTime="2024-03-01T00:00:00Z" packageID="DRV01" path="FOLDER2/1/Network_Driver_DRV01.EXE" rebootRequired="false" vendorVersion="1.0">
    <Name><Display lang="en">Network Driver</Display></Name>
    <ComponentType value="DRVR"><Display lang="en">Driver</Display></ComponentType>
    <Description><Display lang="en">Driver only</Display></Description>
  </SoftwareComponent>
  <SoftwareComponent dateTime="2024-02-01T00:00:00Z" packageID="NIC01" path="FOLDER3/2/Network_Firmware_NIC01.EXE" rebootRequired="false" vendorVersion="22.5.7">
    <Name><Display lang="en">Broadcom NIC Firmware</Display></Name>
    <ComponentType value="FRMW"><Display lang="en">Firmware</Display></ComponentType>
    <Description><Display lang="en">Fixes link flaps.</Display></Description>
    <LUCategory value="Network"><Display lang="en">Network</Display></LUCategory>
    <SupportedDevices>
      <Device componentID="104970"><Display lang="en">NIC</Display></Device>
    </SupportedDevices>
    <SupportedSystems>
      <Brand key="3" prefix="PE">
        <Model systemID="0A2B"><Display lang="en">R750</Display></Model>
      </Brand>
    </SupportedSystems>
    <Criticality value="3"><Display lang="en">Optional</Display></Criticality>
  </SoftwareComponent>
</Manifest>
"#;

    /// Encode as Dell ships it: UTF-16LE with a byte-order mark
    pub(crate) fn utf16le(text: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    fn vendor(system_ids: &[&str]) -> DellVendor {
        DellVendor::new(system_ids.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_parse_catalog_utf16() {
        let manifest = parse_catalog(&utf16le(SAMPLE_CATALOG)).unwrap();
        assert_eq!(manifest.version, "24.05.00");
        assert_eq!(manifest.base_location, "downloads.dell.com");
        assert_eq!(manifest.components.len(), 3);
        assert_eq!(manifest.components[0].name.get("en"), Some("PowerEdge C6615 BIOS"));
        assert!(manifest.components[0].reboot_required);
        assert_eq!(manifest.components[0].system_ids().collect::<Vec<_>>(), vec!["0C60"]);
    }

    #[test]
    fn test_parse_catalog_rejects_garbage() {
        assert!(matches!(parse_catalog(&utf16le("<Manifest><oops")), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_entries_keep_firmware_only() {
        let manifest = parse_catalog(&utf16le(SAMPLE_CATALOG)).unwrap();
        let entries = vendor(&[]).entries(manifest);
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["BIOS_ABC12_WN64_2.1.0.EXE", "Network_Firmware_NIC01.EXE"]);
        assert_eq!(
            entries[0].source_url,
            "https://downloads.dell.com/FOLDER1/1/BIOS_ABC12_WN64_2.1.0.EXE"
        );
    }

    #[test]
    fn test_entries_filter_by_system_id() {
        let manifest = parse_catalog(&utf16le(SAMPLE_CATALOG)).unwrap();
        let entries = vendor(&["0a2b"]).entries(manifest.clone());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "Network_Firmware_NIC01.EXE");

        assert_eq!(vendor(&["*"]).entries(manifest.clone()).len(), 2);
        assert!(vendor(&["FFFF"]).entries(manifest).is_empty());
    }

    #[test]
    fn test_convert_bios() {
        let manifest = parse_catalog(&utf16le(SAMPLE_CATALOG)).unwrap();
        let component = convert(&manifest.components[0]).unwrap();

        let expected_id = Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"PowerEdge C6615 BIOS");
        assert_eq!(component.id, format!("com.dell.{expected_id}"));
        assert_eq!(component.name, "PowerEdge C6615 BIOS");
        assert_eq!(component.summary, "This release adds support for new processors.");
        assert_eq!(component.categories, vec!["X-System"]);

        let guid = Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"REDFISH\\VENDOR_Dell&SYSTEMID_0C60&SOFTWAREID_159");
        assert_eq!(component.provides.len(), 1);
        assert_eq!(component.provides[0].value, guid.to_string());

        assert_eq!(component.custom_value(CUSTOM_DEVICE_FLAGS), Some("skips-restart"));
        assert_eq!(component.custom_value(CUSTOM_UPDATE_MESSAGE), Some("Reboot the server to apply."));
        assert_eq!(component.custom_value(CUSTOM_UPDATE_PROTOCOL), Some("org.dmtf.redfish"));

        let release = &component.releases[0];
        assert_eq!(release.version, "2.1.0");
        assert_eq!(release.date, "2024-04-15");
        assert_eq!(release.urgency, Some(Urgency::Critical));
        assert!(release.checksums.is_empty());
    }

    #[test]
    fn test_convert_without_reboot() {
        let manifest = parse_catalog(&utf16le(SAMPLE_CATALOG)).unwrap();
        let component = convert(&manifest.components[2]).unwrap();
        assert_eq!(component.custom_value(CUSTOM_DEVICE_FLAGS), None);
        assert_eq!(component.categories, vec!["X-NetworkInterface"]);
        assert_eq!(component.releases[0].urgency, Some(Urgency::Low));
        assert_eq!(component.releases[0].date, "2024-02-01");
    }

    #[test]
    fn test_convert_missing_translation() {
        let mut fw = SoftwareComponent {
            date_time: "2024-01-01T00:00:00Z".to_string(),
            ..Default::default()
        };
        fw.name.display.push(types::Display {
            lang: "fr".to_string(),
            value: "Micrologiciel".to_string(),
        });
        assert!(matches!(convert(&fw), Err(Error::Conversion(_))));
    }

    #[test]
    fn test_urgency_mapping() {
        assert_eq!(urgency(1), Urgency::Medium);
        assert_eq!(urgency(2), Urgency::Critical);
        assert_eq!(urgency(3), Urgency::Low);
        assert_eq!(urgency(0), Urgency::Medium);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("FOLDER1/1/BIOS.EXE"), Some("BIOS.EXE"));
        assert_eq!(basename("BIOS.EXE"), Some("BIOS.EXE"));
        assert_eq!(basename("FOLDER/"), None);
    }
}
