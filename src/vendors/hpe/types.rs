// src/vendors/hpe/types.rs

//! HPE repository and package schemas

use serde::Deserialize;

/// Value of one `fwrepo.json` entry (keyed by file name)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub date: String,
    pub description: String,
    #[serde(rename = "deviceclass")]
    pub device_class: String,
    pub minimum_active_version: String,
    pub reboot_required: String,
    pub server_power_off: String,
    pub target: Vec<String>,
    pub version: String,
}

/// `payload.json` inside a `.fwpkg` archive
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Payload {
    #[serde(rename = "DeviceClass")]
    pub device_class: String,
    #[serde(rename = "Devices")]
    pub devices: Devices,
    #[serde(rename = "package")]
    pub package: Package,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Devices {
    #[serde(rename = "Device")]
    pub device: Vec<Device>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Device {
    pub device_name: String,
    pub firmware_images: Vec<FirmwareImage>,
    /// Device GUID targeted by the update
    pub target: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FirmwareImage {
    pub file_name: String,
    pub install_duration_sec: u64,
    pub reset_required: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Package {
    pub category: Vec<Category>,
    pub description: Vec<Translation>,
    pub installation: Installation,
    pub manufacturer_name: Vec<Translation>,
    pub name: Vec<Translation>,
    /// `2024-01-15T00:00:00`, no zone
    pub release_date: String,
    pub sw_keys: Vec<SwKey>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Category {
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Installation {
    pub reboot_details: Vec<RebootDetail>,
    /// "yes" or "no"
    pub reboot_required: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RebootDetail {
    pub language: Vec<Translation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Translation {
    pub lang: String,
    pub x_late: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwKey {
    pub name: String,
}

/// Text for `lang` in a translation list
pub fn translated<'a>(translations: &'a [Translation], lang: &str) -> Option<&'a str> {
    translations
        .iter()
        .find(|t| t.lang == lang)
        .map(|t| t.x_late.as_str())
}
