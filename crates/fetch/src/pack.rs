//! Pack descriptors and their source locations

use osup_store::ContentStore;
use osup_types::{Subscription, Version};
use std::path::{Path, PathBuf};

/// One delta archive to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackDescriptor {
    pub bundle: String,
    pub from: Version,
    pub to: Version,
    pub is_mix: bool,
    /// Remote URL, or the local mix pack path for mix bundles
    pub url: String,
    /// Where the archive is written before extraction
    pub archive: PathBuf,
}

impl PackDescriptor {
    /// Describe the pack for `subscription`
    #[must_use]
    pub fn new(
        subscription: &Subscription,
        is_mix: bool,
        content_url: &str,
        mix_state_dir: &Path,
        store: &ContentStore,
    ) -> Self {
        let (bundle, from, to) = (
            subscription.bundle.as_str(),
            subscription.old_version,
            subscription.new_version,
        );
        let url = if is_mix {
            mix_pack_path(mix_state_dir, bundle, from, to)
                .display()
                .to_string()
        } else {
            pack_url(content_url, bundle, from, to)
        };

        Self {
            bundle: bundle.to_string(),
            from,
            to,
            is_mix,
            url,
            archive: store.pack_archive_path(bundle, from, to),
        }
    }
}

/// Server location of the pack moving `bundle` from `from` to `to`
#[must_use]
pub fn pack_url(content_url: &str, bundle: &str, from: Version, to: Version) -> String {
    format!(
        "{}/{to}/pack-{bundle}-from-{from}.tar",
        content_url.trim_end_matches('/')
    )
}

/// Local location of a pack produced by mix
#[must_use]
pub fn mix_pack_path(mix_state_dir: &Path, bundle: &str, from: Version, to: Version) -> PathBuf {
    mix_state_dir
        .join(to.to_string())
        .join(format!("pack-{bundle}-from-{from}.tar"))
}
