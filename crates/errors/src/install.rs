//! Staging and finalization error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("could not create directory {path}: {message}")]
    CouldNotCreateDir { path: String, message: String },

    #[error("could not remove {path}: {message}")]
    CouldNotRemoveFile { path: String, message: String },

    #[error("could not rename {from} to {to}: {message}")]
    CouldNotRenameFile {
        from: String,
        to: String,
        message: String,
    },

    #[error("could not rename directory {from} to {to}: {message}")]
    CouldNotRenameDir {
        from: String,
        to: String,
        message: String,
    },

    #[error("archive copy into {dest} failed: {message}")]
    ArchiveCopyFailed { dest: String, message: String },

    #[error("unexpected condition at {path}: {message}")]
    UnexpectedCondition { path: String, message: String },

    #[error("could not create file {path}: {message}")]
    CouldNotCreateFile { path: String, message: String },

    #[error("{path} was not staged")]
    NotStaged { path: String },

    #[error("installation cancelled")]
    Cancelled,
}

impl InstallError {
    /// The filesystem path the error is about, when it has one
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::CouldNotCreateDir { path, .. }
            | Self::CouldNotRemoveFile { path, .. }
            | Self::UnexpectedCondition { path, .. }
            | Self::CouldNotCreateFile { path, .. }
            | Self::NotStaged { path } => Some(path),
            Self::CouldNotRenameFile { to, .. } | Self::CouldNotRenameDir { to, .. } => Some(to),
            Self::ArchiveCopyFailed { dest, .. } => Some(dest),
            Self::Cancelled => None,
        }
    }
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnexpectedCondition { .. } => Some(
                "A path on the system does not match what the update expects; repair it and retry.",
            ),
            Self::NotStaged { .. } => Some("Re-run the update so the file is staged first."),
            Self::ArchiveCopyFailed { .. } => {
                Some("Check free space and extended attribute support on the target filesystem.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CouldNotRenameFile { .. }
                | Self::CouldNotRemoveFile { .. }
                | Self::NotStaged { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CouldNotCreateDir { .. } => "install.could_not_create_dir",
            Self::CouldNotRemoveFile { .. } => "install.could_not_remove_file",
            Self::CouldNotRenameFile { .. } => "install.could_not_rename_file",
            Self::CouldNotRenameDir { .. } => "install.could_not_rename_dir",
            Self::ArchiveCopyFailed { .. } => "install.archive_copy_failed",
            Self::UnexpectedCondition { .. } => "install.unexpected_condition",
            Self::CouldNotCreateFile { .. } => "install.could_not_create_file",
            Self::NotStaged { .. } => "install.not_staged",
            Self::Cancelled => "install.cancelled",
        };
        Some(code)
    }
}
