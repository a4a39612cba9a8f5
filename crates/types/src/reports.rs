//! Report type definitions for operations

use serde::{Deserialize, Serialize};

/// A pack the server does not carry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPack {
    pub bundle: String,
    pub url: String,
}

/// A pack that failed to download or extract
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailedPack {
    pub bundle: String,
    pub url: String,
    pub message: String,
}

/// Outcome of a pack fetch batch
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FetchReport {
    /// Packs that needed fetching after filtering
    pub requested: usize,
    /// Bundles whose pack was extracted into the content store
    pub extracted: Vec<String>,
    pub missing: Vec<MissingPack>,
    pub failed: Vec<FailedPack>,
    /// Total bytes to transfer, when every size probe succeeded
    pub total_bytes: Option<u64>,
}

impl FetchReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }
}

/// Outcome of an install batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Number of records the caller expected to be updated
    pub expected: usize,
    pub finalized: usize,
    pub failed: usize,
    /// Records flagged do-not-update
    pub skipped: usize,
    /// Expected updates that did not land
    pub deficit: usize,
}

impl InstallReport {
    #[must_use]
    pub fn new(expected: usize, finalized: usize, failed: usize, skipped: usize) -> Self {
        Self {
            expected,
            finalized,
            failed,
            skipped,
            deficit: expected.saturating_sub(finalized).saturating_sub(skipped),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.deficit == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deficit_saturates() {
        let r = InstallReport::new(10, 8, 1, 1);
        assert_eq!(r.deficit, 0);
        assert!(r.is_success());

        let r = InstallReport::new(10, 7, 3, 0);
        assert_eq!(r.deficit, 3);
        assert!(!r.is_success());

        let r = InstallReport::new(2, 5, 0, 1);
        assert_eq!(r.deficit, 0);
    }
}
