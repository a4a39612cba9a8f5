//! Manifest of manifests
//!
//! The parsed top-level manifest lists every bundle in a release and the
//! file records the client should converge to. Parsing and diffing happen
//! elsewhere; this crate only needs the lookups used while fetching and
//! staging.

use crate::{FileRecord, Version};
use osup_errors::Error;
use serde::{Deserialize, Serialize};

/// A bundle as listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub name: String,
    pub version: Version,
    /// Locally produced content served from the mix state directory
    #[serde(default)]
    pub is_mix: bool,
}

/// Parsed release manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub version: Version,
    #[serde(default)]
    pub bundles: Vec<BundleEntry>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

impl Manifest {
    /// Parse a manifest from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid manifest.
    pub fn from_json(contents: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(contents)?)
    }

    #[must_use]
    pub fn find_bundle(&self, name: &str) -> Option<&BundleEntry> {
        self.bundles.iter().find(|b| b.name == name)
    }

    /// Look up a live (non-deleted) record by absolute path
    #[must_use]
    pub fn find_file(&self, path: &str) -> Option<&FileRecord> {
        let wanted = normalize(path);
        self.files
            .iter()
            .find(|f| !f.is_deleted && normalize(&f.filename) == wanted)
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    }
}
