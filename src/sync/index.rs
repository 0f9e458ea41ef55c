// src/sync/index.rs

//! Published-firmware membership index
//!
//! Run-scoped set of firmware filenames that already have a release in the
//! published metadata. Rebuilt from the metadata at the start of every run
//! and never persisted on its own.

use crate::appstream::Components;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    filenames: HashSet<String>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every release checksum filename of a metadata document
    pub fn from_components(components: &Components) -> Self {
        let mut index = Self::new();
        index.extend_from(components);
        index
    }

    /// Add every checksum filename of `components`
    pub fn extend_from(&mut self, components: &Components) {
        self.filenames
            .extend(components.checksum_filenames().map(str::to_string));
    }

    /// Record a filename; returns false if it was already present
    pub fn insert(&mut self, filename: impl Into<String>) -> bool {
        self.filenames.insert(filename.into())
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }
}
