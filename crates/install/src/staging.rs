//! Staging of file payloads next to their final location
//!
//! A staged regular file or symlink sits at `<dir>/.update.<name>` until the
//! finalizer renames it into place. Directories have no temporary form and
//! are placed directly.

use crate::fix::PathFixer;
use osup_config::fixed_paths::UPDATE_PREFIX;
use osup_errors::{Error, InstallError};
use osup_events::{EventEmitter, EventSender, InstallEvent};
use osup_store::{ArchiveCopy, ContentStore};
use osup_types::{FileKind, FileRecord};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a file reached its staging location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Hard link to the content store entry
    Hardlinked,
    /// Private copy made through the archive copier
    Copied,
    /// Directory created or refreshed in place
    DirectoryPlaced,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardlinked => write!(f, "hardlink"),
            Self::Copied => write!(f, "copy"),
            Self::DirectoryPlaced => write!(f, "directory"),
        }
    }
}

/// Name of the staging temporary for `basename`
#[must_use]
pub fn update_name(basename: &str) -> String {
    format!("{UPDATE_PREFIX}{basename}")
}

/// Places payloads from the content store beside their targets
pub struct Stager {
    root: PathBuf,
    store: ContentStore,
    copier: Arc<dyn ArchiveCopy>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for Stager {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Stager {
    /// Create a stager for the canonical install root `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, store: ContentStore, copier: Arc<dyn ArchiveCopy>) -> Self {
        Self {
            root: root.into(),
            store,
            copier,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Stage one file
    ///
    /// On success a regular file or symlink has `staging` set to its
    /// temporary path. The final path is only touched to remove an object of
    /// the wrong type, or to place a directory.
    ///
    /// # Errors
    ///
    /// Returns an `InstallError` naming the step that failed.
    pub async fn stage(
        &self,
        file: &mut FileRecord,
        fixer: Option<&dyn PathFixer>,
    ) -> Result<StageOutcome, Error> {
        let parent = file.parent_dir().to_string();
        let target_dir = self.root.join(parent.trim_start_matches('/'));

        self.prepare_target_dir(&parent, &target_dir, fixer).await?;
        self.verify_target_dir(&parent, &target_dir).await?;

        let basename = file.basename().to_string();
        if basename.is_empty() {
            // the record for the install root itself
            if !file.is_dir() {
                return Err(InstallError::UnexpectedCondition {
                    path: target_dir.display().to_string(),
                    message: format!("install root recorded as a {}", file.kind),
                }
                .into());
            }
            return Ok(StageOutcome::DirectoryPlaced);
        }

        let update_path = target_dir.join(update_name(&basename));
        osup_root::remove_all(&update_path)
            .await
            .map_err(|e| could_not_remove(&update_path, &e))?;

        let final_path = target_dir.join(&basename);
        self.remove_type_mismatch(&final_path, file.kind).await?;

        if file.is_dir() {
            file.staging = None;
            place_directory(
                &self.store,
                self.copier.as_ref(),
                &file.hash,
                &basename,
                &target_dir,
            )
            .await?;
            return Ok(StageOutcome::DirectoryPlaced);
        }

        let source = self.store.staged_path(&file.hash);
        let outcome = if file.can_hardlink()
            && osup_root::hard_link(&source, &update_path).await.is_ok()
        {
            StageOutcome::Hardlinked
        } else {
            self.copy_file(&source, &basename, &target_dir).await?;
            StageOutcome::Copied
        };

        file.staging = Some(update_path.clone());
        if !osup_root::exists(&update_path).await {
            file.staging = None;
            return Err(InstallError::CouldNotCreateFile {
                path: update_path.display().to_string(),
                message: "staged file is missing after placement".to_string(),
            }
            .into());
        }

        Ok(outcome)
    }

    async fn prepare_target_dir(
        &self,
        parent: &str,
        target_dir: &Path,
        fixer: Option<&dyn PathFixer>,
    ) -> Result<(), Error> {
        match osup_root::lstat(target_dir).await {
            Some(meta) if meta.file_type().is_dir() => Ok(()),
            Some(meta) => Err(InstallError::UnexpectedCondition {
                path: target_dir.display().to_string(),
                message: format!(
                    "expected a directory, found a {}",
                    FileKind::from_metadata(&meta)
                ),
            }
            .into()),
            None => {
                match fixer {
                    Some(fixer) => {
                        if let Err(e) = fixer.fix_path(parent).await {
                            self.emit_warning_with_context(
                                format!("could not recreate {parent}"),
                                e.to_string(),
                            );
                        }
                    }
                    None => self.emit_install(InstallEvent::AutoFixDisabled {
                        directory: parent.to_string(),
                    }),
                }
                Ok(())
            }
        }
    }

    /// The target directory must resolve to itself, with no symlink on the
    /// way, except for the install root
    async fn verify_target_dir(&self, parent: &str, target_dir: &Path) -> Result<(), Error> {
        let canonical = osup_root::canonicalize(target_dir).await.map_err(|e| {
            InstallError::CouldNotCreateDir {
                path: target_dir.display().to_string(),
                message: e.to_string(),
            }
        })?;

        if parent != "/" && canonical != target_dir {
            return Err(InstallError::UnexpectedCondition {
                path: target_dir.display().to_string(),
                message: format!("resolves to {}", canonical.display()),
            }
            .into());
        }
        Ok(())
    }

    async fn remove_type_mismatch(&self, final_path: &Path, kind: FileKind) -> Result<(), Error> {
        let Some(meta) = osup_root::lstat(final_path).await else {
            return Ok(());
        };
        let existing = FileKind::from_metadata(&meta);
        if existing == kind {
            return Ok(());
        }

        self.emit_debug(format!(
            "replacing {existing} at {} with a {kind}",
            final_path.display()
        ));
        osup_root::remove_all(final_path)
            .await
            .map_err(|e| could_not_remove(final_path, &e))
    }

    /// Copy through `staged/.update.<name>` so the copy lands under the
    /// temporary name
    async fn copy_file(&self, source: &Path, basename: &str, target_dir: &Path) -> Result<(), Error> {
        let renamed = self.store.staged_dir().join(update_name(basename));
        rename_file(source, &renamed).await?;
        let copied = self.copier.copy_into(&renamed, target_dir).await;
        rename_file(&renamed, source).await?;
        copied.map_err(|e| archive_copy_failed(target_dir, &e))
    }
}

/// Refresh the directory `target_dir/<basename>` from the store entry `hash`
///
/// The entry is renamed into the scratch directory under the final name so
/// the copy lands with the right name, and is always renamed back.
pub(crate) async fn place_directory(
    store: &ContentStore,
    copier: &dyn ArchiveCopy,
    hash: &str,
    basename: &str,
    target_dir: &Path,
) -> Result<(), Error> {
    let scratch = store.tmp_rename_dir();
    osup_root::ensure_empty_dir(&scratch)
        .await
        .map_err(|e| InstallError::CouldNotCreateDir {
            path: scratch.display().to_string(),
            message: e.to_string(),
        })?;

    let source = store.staged_path(hash);
    let renamed = scratch.join(basename);
    rename_dir(&source, &renamed).await?;
    let copied = copier.copy_into(&renamed, target_dir).await;
    rename_dir(&renamed, &source).await?;
    copied.map_err(|e| archive_copy_failed(target_dir, &e))
}

async fn rename_file(from: &Path, to: &Path) -> Result<(), Error> {
    osup_root::rename(from, to).await.map_err(|e| {
        InstallError::CouldNotRenameFile {
            from: from.display().to_string(),
            to: to.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

async fn rename_dir(from: &Path, to: &Path) -> Result<(), Error> {
    osup_root::rename(from, to).await.map_err(|e| {
        InstallError::CouldNotRenameDir {
            from: from.display().to_string(),
            to: to.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn could_not_remove(path: &Path, error: &Error) -> Error {
    InstallError::CouldNotRemoveFile {
        path: path.display().to_string(),
        message: error.to_string(),
    }
    .into()
}

fn archive_copy_failed(dest: &Path, error: &Error) -> Error {
    InstallError::ArchiveCopyFailed {
        dest: dest.display().to_string(),
        message: error.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_name() {
        assert_eq!(update_name("tool"), ".update.tool");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(StageOutcome::Hardlinked.to_string(), "hardlink");
        assert_eq!(StageOutcome::Copied.to_string(), "copy");
        assert_eq!(StageOutcome::DirectoryPlaced.to_string(), "directory");
    }
}
