//! Content store and archive errors

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::Path;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("no space left on device: {path}")]
    DiskFull { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("unrecognized archive format: {path}")]
    UnknownArchiveFormat { path: String },

    #[error("archive entry escapes destination: {entry}")]
    UnsafeArchiveEntry { entry: String },

    #[error("archive copy of {source_path} into {dest} failed: {message}")]
    ArchiveCopy {
        source_path: String,
        dest: String,
        message: String,
    },
}

impl StorageError {
    /// Classify an `io::Error` raised while touching `path`
    #[must_use]
    pub fn from_io_with_path(err: &std::io::Error, path: &Path) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            ErrorKind::NotFound => Self::PathNotFound { path },
            ErrorKind::StorageFull => Self::DiskFull { path },
            _ => Self::Io {
                path,
                message: err.to_string(),
            },
        }
    }
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DiskFull { .. } => Some("Free up disk space under the state directory and retry."),
            Self::PermissionDenied { .. } => Some("Run the updater as root."),
            Self::UnknownArchiveFormat { .. } | Self::UnsafeArchiveEntry { .. } => {
                Some("The pack appears corrupt; remove it from the state directory and fetch again.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::DiskFull { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DiskFull { .. } => "storage.disk_full",
            Self::PermissionDenied { .. } => "storage.permission_denied",
            Self::PathNotFound { .. } => "storage.path_not_found",
            Self::Io { .. } => "storage.io",
            Self::UnknownArchiveFormat { .. } => "storage.unknown_archive_format",
            Self::UnsafeArchiveEntry { .. } => "storage.unsafe_archive_entry",
            Self::ArchiveCopy { .. } => "storage.archive_copy",
        };
        Some(code)
    }
}
