//! Promotion of staged files into their final location
//!
//! Each file is finalized with a single rename, or a recursive removal for
//! deletions, so an interrupted batch leaves every path either old or new.

use osup_config::fixed_paths::LOST_FOUND_DIR;
use osup_errors::{Error, InstallError};
use osup_events::{EventEmitter, EventSender, InstallEvent};
use osup_types::FileRecord;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const LOST_FOUND_MODE: u32 = 0o700;

/// What finalizing a file did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Staged file renamed onto the final path
    Promoted,
    /// A directory in the way went to lost+found, then the file was promoted
    MovedAsideAndPromoted,
    /// A directory in the way could not be moved aside; the staged file was
    /// dropped and the directory left alone
    StagedDropped,
    /// Deleted path removed, or already absent
    Deleted,
    /// Deletion skipped because the parent resolves through a symlink
    DeletionSkipped,
    /// Directories and ghosted files need no finalization
    Unchanged,
}

/// Renames staged files into place under the install root
pub struct Finalizer {
    root: PathBuf,
    event_sender: Option<EventSender>,
}

impl EventEmitter for Finalizer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Finalizer {
    /// Create a finalizer for the canonical install root `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Finalize one file
    ///
    /// # Errors
    ///
    /// Returns `NotStaged` for a live file without a staging path,
    /// `CouldNotRemoveFile` when a deletion fails, and `CouldNotRenameFile`
    /// when the staged file cannot be moved into place.
    pub async fn finalize(&self, file: &mut FileRecord) -> Result<FinalizeOutcome, Error> {
        if file.staging.is_none() && !file.is_deleted && !file.is_dir() {
            return Err(InstallError::NotStaged {
                path: file.filename.clone(),
            }
            .into());
        }

        if file.is_deleted && !file.is_ghosted {
            return self.delete(file).await;
        }

        let Some(staged) = file.staging.clone() else {
            return Ok(FinalizeOutcome::Unchanged);
        };
        if file.is_dir() || file.is_ghosted {
            return Ok(FinalizeOutcome::Unchanged);
        }

        let final_path = file.target_path(&self.root);
        let mut outcome = FinalizeOutcome::Promoted;

        if osup_root::is_real_dir(&final_path).await {
            if !self.move_to_lost_found(file, &final_path).await? {
                if let Err(e) = osup_root::remove_file_if_exists(&staged).await {
                    self.emit_warning_with_context(
                        format!("could not drop staged {}", staged.display()),
                        e.to_string(),
                    );
                }
                file.staging = None;
                return Ok(FinalizeOutcome::StagedDropped);
            }
            outcome = FinalizeOutcome::MovedAsideAndPromoted;
        }

        osup_root::rename(&staged, &final_path).await.map_err(|e| {
            InstallError::CouldNotRenameFile {
                from: staged.display().to_string(),
                to: final_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        // Renaming one hard link onto another of the same inode is a no-op
        // that leaves the source behind.
        if let Err(e) = osup_root::remove_file_if_exists(&staged).await {
            self.emit_warning_with_context(
                format!("could not remove leftover {}", staged.display()),
                e.to_string(),
            );
        }
        file.staging = None;
        Ok(outcome)
    }

    async fn delete(&self, file: &FileRecord) -> Result<FinalizeOutcome, Error> {
        let final_path = file.target_path(&self.root);
        let Some(parent) = final_path.parent() else {
            return Ok(FinalizeOutcome::Unchanged);
        };

        match osup_root::canonicalize(parent).await {
            Ok(canonical) if canonical != parent => {
                self.emit_install(InstallEvent::DeletionSkipped {
                    path: file.filename.clone(),
                    reason: format!("parent resolves to {}", canonical.display()),
                });
                return Ok(FinalizeOutcome::DeletionSkipped);
            }
            Ok(_) => {}
            Err(e) if is_absent(&e) => return Ok(FinalizeOutcome::Deleted),
            Err(e) => return Err(could_not_remove(&final_path, &e)),
        }

        match osup_root::remove_all(&final_path).await {
            Ok(()) => Ok(FinalizeOutcome::Deleted),
            Err(e) if is_absent(&e) => Ok(FinalizeOutcome::Deleted),
            Err(e) => Err(could_not_remove(&final_path, &e)),
        }
    }

    /// Move a directory found at a file's final path into lost+found
    ///
    /// Returns `false` when lost+found already holds an entry of that name.
    async fn move_to_lost_found(&self, file: &FileRecord, final_path: &Path) -> Result<bool, Error> {
        let lost_found = self.root.join(LOST_FOUND_DIR);
        osup_root::create_dir_with_mode(&lost_found, LOST_FOUND_MODE)
            .await
            .map_err(|e| InstallError::CouldNotCreateDir {
                path: lost_found.display().to_string(),
                message: e.to_string(),
            })?;

        let destination = lost_found.join(file.basename());
        match osup_root::rename(final_path, &destination).await {
            Ok(()) => {
                self.emit_install(InstallEvent::MovedToLostFound {
                    path: file.filename.clone(),
                    destination,
                });
                Ok(true)
            }
            Err(e) if is_occupied(&e) => {
                self.emit_warning_with_context(
                    format!(
                        "{} is a directory and {} is taken; leaving it in place",
                        file.filename,
                        destination.display()
                    ),
                    e.to_string(),
                );
                Ok(false)
            }
            Err(e) => Err(InstallError::CouldNotRenameFile {
                from: final_path.display().to_string(),
                to: destination.display().to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }
}

fn is_absent(error: &Error) -> bool {
    matches!(
        error.io_kind(),
        Some(ErrorKind::NotFound | ErrorKind::NotADirectory)
    )
}

fn is_occupied(error: &Error) -> bool {
    matches!(
        error.io_kind(),
        Some(ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty)
    )
}

fn could_not_remove(path: &Path, error: &Error) -> Error {
    InstallError::CouldNotRemoveFile {
        path: path.display().to_string(),
        message: error.to_string(),
    }
    .into()
}
