use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Staging and finalization domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    StagingStarted {
        files: usize,
    },

    FileStaged {
        path: String,
        method: String,
    },

    StagingFailed {
        path: String,
        failure: super::FailureContext,
    },

    /// The target directory was missing and auto-fix is off
    AutoFixDisabled {
        directory: String,
    },

    /// Filesystem flushed to stable storage
    Synced {
        phase: String,
    },

    FileFinalized {
        path: String,
    },

    FinalizeFailed {
        path: String,
        failure: super::FailureContext,
    },

    /// A directory sitting where a file belongs was moved aside
    MovedToLostFound {
        path: String,
        destination: PathBuf,
    },

    DeletionSkipped {
        path: String,
        reason: String,
    },

    Completed {
        expected: usize,
        finalized: usize,
        failed: usize,
        skipped: usize,
        deficit: usize,
    },
}
