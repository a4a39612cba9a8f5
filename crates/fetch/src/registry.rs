//! Installed-bundle lookup

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Answers whether a bundle is currently installed
pub trait BundleRegistry: Send + Sync {
    fn is_installed(&self, bundle: &str) -> bool;
}

/// Registry backed by the tracking directory under the install root
///
/// A bundle is installed when `<root>/<bundles_dir>/<name>` exists.
#[derive(Debug, Clone)]
pub struct TrackingDirRegistry {
    dir: PathBuf,
}

impl TrackingDirRegistry {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn from_config(config: &osup_config::Config) -> Self {
        Self::new(config.bundles_path())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BundleRegistry for TrackingDirRegistry {
    fn is_installed(&self, bundle: &str) -> bool {
        if bundle.is_empty() || bundle.contains('/') {
            return false;
        }
        self.dir.join(bundle).symlink_metadata().is_ok()
    }
}

impl BundleRegistry for HashSet<String> {
    fn is_installed(&self, bundle: &str) -> bool {
        self.contains(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_dir_lookup() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("editors"), b"").unwrap();
        let registry = TrackingDirRegistry::new(temp.path());

        assert!(registry.is_installed("editors"));
        assert!(!registry.is_installed("games"));
        assert!(!registry.is_installed("../editors"));
        assert!(!registry.is_installed(""));
    }
}
