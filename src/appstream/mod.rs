// src/appstream/mod.rs

//! AppStream firmware metadata
//!
//! Types for the LVFS/fwupd flavour of AppStream: the per-firmware metainfo
//! fragment packed into each cabinet (`<component>`), and the repository
//! index listing every published component (`<components>`).
//!
//! # Document shape
//!
//! ```xml
//! <components origin="firmirror">
//!   <component type="firmware">
//!     <id>com.dell.5a1e...</id>
//!     <name>BIOS</name>
//!     <provides><firmware type="flashed">GUID</firmware></provides>
//!     <releases>
//!       <release version="1.2.3" date="2024-01-01" install_duration="0">
//!         <location>bios.exe.cab</location>
//!         <checksum type="sha256" filename="bios.exe" target="content">...</checksum>
//!       </release>
//!     </releases>
//!   </component>
//! </components>
//! ```
//!
//! Wrapper elements (`<releases>`, `<provides>`, `<custom>`, ...) are hidden
//! from the Rust API: fields hold plain `Vec`s and the wrapping happens in
//! the serde helpers at the bottom of this file.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;

/// XML declaration prepended to every document we write
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// `origin` attribute of the published index
pub const DEFAULT_ORIGIN: &str = "firmirror";

/// Custom key carrying a vendor message shown before install
pub const CUSTOM_UPDATE_MESSAGE: &str = "LVFS::UpdateMessage";

/// Custom key carrying fwupd device flags
pub const CUSTOM_DEVICE_FLAGS: &str = "LVFS::DeviceFlags";

/// Custom key naming the protocol used to deploy the update
pub const CUSTOM_UPDATE_PROTOCOL: &str = "LVFS::UpdateProtocol";

/// Custom key describing payload integrity
pub const CUSTOM_DEVICE_INTEGRITY: &str = "LVFS::DeviceIntegrity";

/// Published repository index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "components")]
pub struct Components {
    #[serde(rename = "@origin", default)]
    pub origin: String,
    #[serde(rename = "component", default)]
    pub components: Vec<Component>,
}

impl Components {
    /// Create an empty index with the given origin
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            components: Vec::new(),
        }
    }

    /// Parse an index document
    pub fn from_xml(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| Error::Xml(format!("Invalid metadata document: {e}")))
    }

    /// Serialize the index with an XML declaration
    pub fn to_xml(&self) -> Result<String> {
        to_document(self)
    }

    /// Iterate over every release checksum filename in the index
    pub fn checksum_filenames(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .flat_map(|c| c.releases.iter())
            .flat_map(|r| r.checksums.iter())
            .map(|c| c.filename.as_str())
            .filter(|f| !f.is_empty())
    }

    /// Total number of releases across all components
    pub fn release_count(&self) -> usize {
        self.components.iter().map(|c| c.releases.len()).sum()
    }
}

/// One firmware family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "component")]
pub struct Component {
    #[serde(rename = "@type", default = "default_component_type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_variant_suffix: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,
    #[serde(default)]
    pub description: Description,
    #[serde(default, with = "provides_list")]
    pub provides: Vec<Provide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    #[serde(default)]
    pub metadata_license: String,
    #[serde(default)]
    pub project_license: String,
    #[serde(default, with = "release_list")]
    pub releases: Vec<Release>,
    #[serde(default, skip_serializing_if = "Requires::is_empty")]
    pub requires: Requires,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "custom_list")]
    pub custom: Vec<CustomValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "keyword_list")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "category_list")]
    pub categories: Vec<String>,
}

fn default_component_type() -> String {
    "firmware".to_string()
}

impl Component {
    /// Create a firmware component with proprietary licensing
    pub fn firmware(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: default_component_type(),
            id: id.into(),
            name: name.into(),
            metadata_license: "proprietary".to_string(),
            project_license: "proprietary".to_string(),
            ..Default::default()
        }
    }

    /// Serialize as a standalone metainfo fragment
    pub fn to_xml(&self) -> Result<String> {
        to_document(self)
    }

    /// Parse a standalone metainfo fragment
    pub fn from_xml(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| Error::Xml(format!("Invalid metainfo document: {e}")))
    }

    /// Look up a custom value by key
    pub fn custom_value(&self, key: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.value.as_str())
    }

    /// Append a custom key/value pair
    pub fn push_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.push(CustomValue {
            key: key.into(),
            value: value.into(),
        });
    }
}

/// Rich-text description, stored as a list of paragraphs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "p", default)]
    pub paragraphs: Vec<String>,
}

impl Description {
    /// Description made of a single paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![text.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.iter().all(|p| p.trim().is_empty())
    }
}

/// `<firmware type="flashed">GUID</firmware>` entry (provides or requires)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provide {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "@compare", default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<String>,
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl Provide {
    /// A device GUID flashed by this firmware
    pub fn flashed(guid: impl Into<String>) -> Self {
        Self {
            kind: "flashed".to_string(),
            value: guid.into(),
            ..Default::default()
        }
    }
}

/// `<url type="homepage">...</url>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Url {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl Url {
    pub fn homepage(url: impl Into<String>) -> Self {
        Self {
            kind: "homepage".to_string(),
            value: url.into(),
        }
    }
}

/// One installable version of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    #[serde(rename = "@urgency", default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@date", default)]
    pub date: String,
    #[serde(rename = "@install_duration", default)]
    pub install_duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "checksum", default)]
    pub checksums: Vec<Checksum>,
    #[serde(default)]
    pub description: Description,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "issue_list")]
    pub issues: Vec<Issue>,
}

impl Release {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Filename of the first checksum; identifies the release
    pub fn primary_filename(&self) -> Option<&str> {
        self.checksums
            .first()
            .map(|c| c.filename.as_str())
            .filter(|f| !f.is_empty())
    }

    /// Set the location from the primary checksum when none is set
    ///
    /// Returns true when a location was derived.
    pub fn derive_location(&mut self) -> bool {
        if self.location.as_deref().is_some_and(|l| !l.is_empty()) {
            return false;
        }
        match self.primary_filename() {
            Some(filename) => {
                self.location = Some(format!("{filename}.cab"));
                true
            }
            None => false,
        }
    }
}

/// Release urgency as understood by fwupd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Digest of one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(rename = "@type")]
    pub algorithm: HashAlgorithm,
    #[serde(rename = "@filename", default)]
    pub filename: String,
    #[serde(rename = "@target")]
    pub target: ChecksumTarget,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl Checksum {
    /// Checksum of the firmware payload itself
    pub fn content(algorithm: HashAlgorithm, filename: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            filename: filename.into(),
            target: ChecksumTarget::Content,
            value: value.into(),
        }
    }
}

/// What a checksum covers: the firmware payload or the cabinet around it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumTarget {
    Content,
    Container,
}

/// Known issue (CVE, vendor advisory) fixed by a release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// `<requires>` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requires {
    #[serde(rename = "id", default)]
    pub ids: Vec<RequiredId>,
    #[serde(rename = "firmware", default)]
    pub firmware: Vec<Provide>,
}

impl Requires {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.firmware.is_empty()
    }
}

/// `<id compare="ge" version="1.9.0">org.freedesktop.fwupd</id>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredId {
    #[serde(rename = "@compare", default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<String>,
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// `<value key="LVFS::...">...</value>` inside `<custom>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomValue {
    #[serde(rename = "@key")]
    pub key: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

fn to_document<T: Serialize>(value: &T) -> Result<String> {
    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 2);
    value
        .serialize(serializer)
        .map_err(|e| Error::Xml(format!("Failed to serialize metadata: {e}")))?;

    let mut out = String::with_capacity(XML_HEADER.len() + body.len() + 1);
    out.push_str(XML_HEADER);
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

/// Generates a serde `with` module mapping `Vec<T>` to `<wrapper><child/>...</wrapper>`
macro_rules! wrapped_list {
    ($module:ident, $child:literal, $item:ty) => {
        mod $module {
            use super::*;
            use serde::{Deserializer, Serializer};

            #[derive(Serialize)]
            struct WrapperRef<'a> {
                #[serde(rename = $child)]
                items: &'a [$item],
            }

            #[derive(Deserialize)]
            struct Wrapper {
                #[serde(rename = $child, default)]
                items: Vec<$item>,
            }

            pub fn serialize<S: Serializer>(items: &[$item], serializer: S) -> std::result::Result<S::Ok, S::Error> {
                WrapperRef { items }.serialize(serializer)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<$item>, D::Error> {
                Ok(Wrapper::deserialize(deserializer)?.items)
            }
        }
    };
}

wrapped_list!(provides_list, "firmware", Provide);
wrapped_list!(release_list, "release", Release);
wrapped_list!(custom_list, "value", CustomValue);
wrapped_list!(keyword_list, "keyword", String);
wrapped_list!(category_list, "category", String);
wrapped_list!(issue_list, "issue", Issue);
