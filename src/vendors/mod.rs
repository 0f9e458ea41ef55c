// src/vendors/mod.rs

//! Vendor implementations
//!
//! - [`dell`]: Dell enterprise catalog (`catalog.xml.gz`)
//! - [`hpe`]: HPE Service Pack for ProLiant firmware repositories
//!
//! Both vendors deploy through Redfish, so their components share the same
//! protocol and integrity markers.

pub mod dell;
pub mod hpe;
pub mod http;

pub use dell::DellVendor;
pub use hpe::HpeVendor;
pub use http::HttpClient;

use crate::appstream::{
    Component, CUSTOM_DEVICE_FLAGS, CUSTOM_DEVICE_INTEGRITY, CUSTOM_UPDATE_MESSAGE, CUSTOM_UPDATE_PROTOCOL,
};

/// Language used for names, summaries and messages
pub const LANGUAGE: &str = "en";

/// Mark a component as deployed through Redfish with signed payloads
pub(crate) fn push_redfish_markers(component: &mut Component) {
    component.push_custom(CUSTOM_UPDATE_PROTOCOL, "org.dmtf.redfish");
    component.push_custom(CUSTOM_DEVICE_INTEGRITY, "signed");
}

/// Record that installation needs a reboot the updater will not perform
pub(crate) fn push_reboot_notice(component: &mut Component, message: impl Into<String>) {
    component.push_custom(CUSTOM_DEVICE_FLAGS, "skips-restart");
    component.push_custom(CUSTOM_UPDATE_MESSAGE, message);
}
