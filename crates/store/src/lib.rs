#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Content-addressed storage for osup
//!
//! This crate manages the state directory where fetched payloads live under
//! `staged/<hash>`. Entries are never modified once extracted, so the
//! staging engine can hard-link from them freely. Packs are extracted here
//! and leave a zero-length marker behind so they are not fetched twice.

mod archive;
mod copy;

pub use archive::{extract_archive, ArchiveFormat};
pub use copy::{ArchiveCopy, TarCopier};

use osup_config::fixed_paths::{STAGED_DIR, TMP_RENAME_DIR};
use osup_errors::{Error, FetchError};
use osup_types::Version;
use std::path::{Path, PathBuf};

/// Content store rooted at the updater's state directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    state_dir: PathBuf,
}

impl ContentStore {
    /// Create a new store instance
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Directory holding every extracted payload
    #[must_use]
    pub fn staged_dir(&self) -> PathBuf {
        self.state_dir.join(STAGED_DIR)
    }

    /// Location of the payload for a content hash
    #[must_use]
    pub fn staged_path(&self, hash: &str) -> PathBuf {
        self.staged_dir().join(hash)
    }

    /// Check if a payload is present, without following symlinks
    pub async fn has_content(&self, hash: &str) -> bool {
        osup_root::exists(&self.staged_path(hash)).await
    }

    /// Scratch directory used to rename directory payloads before copying
    #[must_use]
    pub fn tmp_rename_dir(&self) -> PathBuf {
        self.state_dir.join(TMP_RENAME_DIR)
    }

    /// Local path of the pack moving `bundle` from `from` to `to`
    #[must_use]
    pub fn pack_archive_path(&self, bundle: &str, from: Version, to: Version) -> PathBuf {
        self.state_dir.join(pack_archive_name(bundle, from, to))
    }

    /// Whether a pack was already extracted
    ///
    /// Only a zero-length regular file counts: a non-empty one is a download
    /// that never got extracted.
    pub async fn has_marker(&self, bundle: &str, from: Version, to: Version) -> bool {
        let path = self.pack_archive_path(bundle, from, to);
        osup_root::lstat(&path)
            .await
            .is_some_and(|meta| meta.file_type().is_file() && meta.len() == 0)
    }

    /// Create the state and staged directories
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created.
    pub async fn ensure_layout(&self) -> Result<(), Error> {
        osup_root::create_dir_all(&self.staged_dir()).await
    }

    /// Extract a downloaded or linked pack into the state directory
    ///
    /// The archive is removed whatever happens. Only a successful extraction
    /// leaves the zero-length marker at its path.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionFailed` if the pack cannot be unpacked or the
    /// marker cannot be written.
    pub async fn finalize_pack(&self, archive: &Path) -> Result<(), Error> {
        let extracted = extract_archive(archive, &self.state_dir).await;
        let removed = osup_root::remove_file_if_exists(archive).await;

        let failed = |e: Error| -> Error {
            FetchError::ExtractionFailed {
                archive: archive.display().to_string(),
                message: e.to_string(),
            }
            .into()
        };

        extracted.map_err(failed)?;
        removed.map_err(failed)?;
        tokio::fs::File::create(archive)
            .await
            .map_err(|e| failed(Error::io_with_path(&e, archive)))?;
        Ok(())
    }
}

/// File name of the pack moving `bundle` from `from` to `to`
#[must_use]
pub fn pack_archive_name(bundle: &str, from: Version, to: Version) -> String {
    format!("pack-{bundle}-from-{from}-to-{to}.tar")
}
