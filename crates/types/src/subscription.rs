//! Bundle subscriptions

use crate::Version;
use serde::{Deserialize, Serialize};

/// A bundle moving from one release to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub bundle: String,
    pub old_version: Version,
    pub new_version: Version,
}

impl Subscription {
    #[must_use]
    pub fn new(bundle: impl Into<String>, old_version: Version, new_version: Version) -> Self {
        Self {
            bundle: bundle.into(),
            old_version,
            new_version,
        }
    }

    /// Whether the transition moves forward and so needs a delta pack
    #[must_use]
    pub fn needs_pack(&self) -> bool {
        self.old_version < self.new_version
    }
}
