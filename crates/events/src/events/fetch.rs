use serde::{Deserialize, Serialize};
use osup_types::Version;

/// Pack fetch domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetchEvent {
    /// Every subscription was current or already extracted
    NothingToFetch,

    BatchStarted {
        packs: usize,
        total_bytes: Option<u64>,
    },

    PackQueued {
        bundle: String,
        from: Version,
        to: Version,
        url: String,
        is_mix: bool,
    },

    /// Pack skipped because its completion marker is present
    PackAlreadyPresent {
        bundle: String,
        from: Version,
        to: Version,
    },

    PackExtracted {
        bundle: String,
    },

    PackMissing {
        bundle: String,
        url: String,
    },

    PackFailed {
        bundle: String,
        url: String,
        failure: super::FailureContext,
    },

    /// Consolidated list of packs the server did not have
    MissingPacks {
        urls: Vec<String>,
    },

    BatchCompleted {
        extracted: usize,
        missing: usize,
        failed: usize,
    },
}
