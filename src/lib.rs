// src/lib.rs

//! firmirror: LVFS-compatible firmware mirror
//!
//! Pulls firmware catalogs from hardware vendors, packages every new
//! firmware as a cabinet and publishes an incrementally updated, signed
//! `metadata.xml.zst` index that fwupd clients can consume.
//!
//! # Architecture
//!
//! - Vendors are plugins behind the [`vendor::Vendor`] trait
//! - Storage is a flat key/blob namespace (local directory or S3 bucket)
//! - The published index is the only state: every run rebuilds its
//!   membership index from it and merges new components into it
//! - Packaging and signing are delegated to `fwupdtool` and `jcat-tool`

pub mod appstream;
pub mod cli;
pub mod compression;
pub mod config;
mod error;
pub mod hash;
pub mod storage;
pub mod sync;
pub mod tools;
pub mod vendor;
pub mod vendors;

pub use appstream::{Component, Components, Release};
pub use config::{FileConfig, SyncConfig};
pub use error::{Error, Result};
pub use hash::{FirmwareDigests, HashAlgorithm};
pub use storage::{LocalStorage, S3Settings, S3Storage, Storage};
pub use sync::{FirmwareSyncer, MembershipIndex, RunSummary, VendorReport};
pub use vendor::{Catalog, FirmwareEntry, Vendor};
