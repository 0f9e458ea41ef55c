// src/vendors/dell/types.rs

//! Dell catalog schema
//!
//! Only the parts of `catalog.xml` used for mirroring are modeled; every
//! other element and attribute is ignored by the deserializer.

use serde::Deserialize;

/// Root `<Manifest>` element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DellManifest {
    #[serde(rename = "@version", default)]
    pub version: String,
    #[serde(rename = "@dateTime", default)]
    pub date_time: String,
    /// Download host, without scheme ("downloads.dell.com")
    #[serde(rename = "@baseLocation", default)]
    pub base_location: String,
    #[serde(rename = "SoftwareComponent", default)]
    pub components: Vec<SoftwareComponent>,
}

/// One downloadable package (firmware, driver, application...)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoftwareComponent {
    #[serde(rename = "@dateTime", default)]
    pub date_time: String,
    #[serde(rename = "@packageID", default)]
    pub package_id: String,
    /// Path relative to the download host ("FOLDER123/1/BIOS_ABC.EXE")
    #[serde(rename = "@path", default)]
    pub path: String,
    #[serde(rename = "@rebootRequired", default)]
    pub reboot_required: bool,
    #[serde(rename = "@vendorVersion", default)]
    pub vendor_version: String,
    #[serde(rename = "Name", default)]
    pub name: Translatable,
    #[serde(rename = "ComponentType", default)]
    pub component_type: TranslatableWithValue,
    #[serde(rename = "Description", default)]
    pub description: Translatable,
    #[serde(rename = "LUCategory", default)]
    pub lu_category: TranslatableWithValue,
    #[serde(rename = "ImportantInfo", default)]
    pub important_info: Translatable,
    #[serde(rename = "SupportedDevices", default)]
    pub supported_devices: SupportedDevices,
    #[serde(rename = "SupportedSystems", default)]
    pub supported_systems: SupportedSystems,
    #[serde(rename = "Criticality", default)]
    pub criticality: Criticality,
}

impl SoftwareComponent {
    /// Every system ID this package applies to
    pub fn system_ids(&self) -> impl Iterator<Item = &str> {
        self.supported_systems
            .brands
            .iter()
            .flat_map(|b| b.models.iter())
            .map(|m| m.system_id.as_str())
    }
}

/// Localized text: `<X><Display lang="en">...</Display></X>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Translatable {
    #[serde(rename = "Display", default)]
    pub display: Vec<Display>,
}

impl Translatable {
    /// Text for `lang`, if present
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.display
            .iter()
            .find(|d| d.lang == lang)
            .map(|d| d.value.trim())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Display {
    #[serde(rename = "@lang", default)]
    pub lang: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// Localized text with a machine-readable `value` attribute
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslatableWithValue {
    #[serde(rename = "@value", default)]
    pub value: String,
    #[serde(rename = "Display", default)]
    pub display: Vec<Display>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Criticality {
    #[serde(rename = "@value", default)]
    pub value: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupportedDevices {
    #[serde(rename = "Device", default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Device {
    #[serde(rename = "@componentID", default)]
    pub component_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupportedSystems {
    #[serde(rename = "Brand", default)]
    pub brands: Vec<Brand>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Brand {
    #[serde(rename = "@prefix", default)]
    pub prefix: String,
    #[serde(rename = "Model", default)]
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Model {
    /// Four hex digits identifying the platform ("0C60")
    #[serde(rename = "@systemID", default)]
    pub system_id: String,
}
