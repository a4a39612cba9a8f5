//! File records tracked by the update system

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Kind of filesystem object a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Directory,
    Regular,
    Symlink,
}

impl FileKind {
    /// Classify an on-disk object from its (non-followed) metadata
    #[must_use]
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else {
            Self::Regular
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::Regular => write!(f, "file"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

/// One path tracked by the update system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path inside the install root, e.g. `/usr/bin/tool`
    pub filename: String,
    /// Content hash naming the payload in the content store
    pub hash: String,
    pub kind: FileKind,
    #[serde(default)]
    pub is_config: bool,
    #[serde(default)]
    pub is_state: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_ghosted: bool,
    #[serde(default)]
    pub use_xattrs: bool,
    #[serde(default)]
    pub do_not_update: bool,
    /// Temporary location of the staged payload beside the final path
    #[serde(skip)]
    pub staging: Option<PathBuf>,
}

impl FileRecord {
    /// A regular file record with every flag cleared
    #[must_use]
    pub fn regular(filename: impl Into<String>, hash: impl Into<String>) -> Self {
        Self::with_kind(filename, hash, FileKind::Regular)
    }

    #[must_use]
    pub fn directory(filename: impl Into<String>, hash: impl Into<String>) -> Self {
        Self::with_kind(filename, hash, FileKind::Directory)
    }

    #[must_use]
    pub fn symlink(filename: impl Into<String>, hash: impl Into<String>) -> Self {
        Self::with_kind(filename, hash, FileKind::Symlink)
    }

    fn with_kind(filename: impl Into<String>, hash: impl Into<String>, kind: FileKind) -> Self {
        Self {
            filename: filename.into(),
            hash: hash.into(),
            kind,
            is_config: false,
            is_state: false,
            is_deleted: false,
            is_ghosted: false,
            use_xattrs: false,
            do_not_update: false,
            staging: None,
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// Path relative to the install root (no leading slash)
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        Path::new(self.filename.trim_start_matches('/'))
    }

    /// Absolute location of this record under `root`
    #[must_use]
    pub fn target_path(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }

    /// Final path component, empty for the root itself
    #[must_use]
    pub fn basename(&self) -> &str {
        self.filename
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Parent directory of the record, as an absolute manifest path
    #[must_use]
    pub fn parent_dir(&self) -> &str {
        let trimmed = self.filename.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &trimmed[..idx],
        }
    }

    /// Whether the payload may be hard-linked out of the content store
    ///
    /// Config and state files get private copies, as do symlinks and files
    /// carrying extended attributes.
    #[must_use]
    pub fn can_hardlink(&self) -> bool {
        !self.is_config && !self.is_state && !self.use_xattrs && !self.is_link()
    }

    /// Order in which records must be finalized: filename ascending, and a
    /// live record before a deleted one with the same name
    #[must_use]
    pub fn install_order(&self, other: &Self) -> Ordering {
        self.filename
            .cmp(&other.filename)
            .then_with(|| self.is_deleted.cmp(&other.is_deleted))
    }
}

/// Sort records into install order
pub fn sort_for_install(files: &mut [FileRecord]) {
    files.sort_by(FileRecord::install_order);
}

/// Whether records are already in install order
#[must_use]
pub fn is_install_ordered(files: &[FileRecord]) -> bool {
    files
        .windows(2)
        .all(|pair| pair[0].install_order(&pair[1]) != Ordering::Greater)
}
