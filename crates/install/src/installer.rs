//! Staging and finalization of a whole file list

use crate::context::InstallContext;
use crate::finalize::Finalizer;
use crate::fix::{ManifestPathFixer, PathFixer};
use crate::staging::Stager;
use osup_errors::Error;
use osup_events::{EventEmitter, FailureContext, InstallEvent};
use osup_store::{ArchiveCopy, ContentStore, TarCopier};
use osup_types::{is_install_ordered, sort_for_install, FileRecord, InstallReport, Manifest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const PROGRESS_ID: &str = "install-files";

/// Installs staged content onto the live root in two phases
///
/// Every file is staged before any rename happens, so a staging failure
/// leaves the system untouched. Finalization then renames file by file in
/// parent-before-child order.
pub struct Installer {
    root: PathBuf,
    store: ContentStore,
    copier: Arc<dyn ArchiveCopy>,
    context: InstallContext,
}

impl Installer {
    /// Create an installer for `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the install root cannot be resolved.
    pub async fn new(
        root: &Path,
        store: ContentStore,
        context: InstallContext,
    ) -> Result<Self, Error> {
        let root = osup_root::canonicalize(root).await?;
        Ok(Self {
            root,
            store,
            copier: Arc::new(TarCopier::new()),
            context,
        })
    }

    #[must_use]
    pub fn with_copier(mut self, copier: impl ArchiveCopy + 'static) -> Self {
        self.copier = Arc::new(copier);
        self
    }

    /// The canonical install root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stage and finalize `files`
    ///
    /// Files are put in install order first if needed. Individual finalize
    /// failures are counted rather than returned; callers must check
    /// [`InstallReport::is_success`].
    ///
    /// # Errors
    ///
    /// Returns the first staging failure, before any file was renamed, or
    /// an error if the filesystem cannot be synced.
    pub async fn install_files(
        &self,
        files: &mut [FileRecord],
        manifest: &Manifest,
    ) -> Result<InstallReport, Error> {
        if !is_install_ordered(files) {
            sort_for_install(files);
        }

        let started = Instant::now();
        let total = (files.len() * 2) as u64;
        self.context.emit_install(InstallEvent::StagingStarted { files: files.len() });
        self.context
            .emit_progress_started(PROGRESS_ID, "Installing files", Some(total));

        let mut complete = 0u64;
        if let Err(e) = self.stage_all(files, manifest, &mut complete, total).await {
            self.context
                .emit_progress_failed(PROGRESS_ID, FailureContext::from_error(&e));
            return Err(e);
        }

        osup_root::sync().await?;
        self.context.emit_install(InstallEvent::Synced {
            phase: "staged".to_string(),
        });

        let mut finalizer = Finalizer::new(&self.root);
        if let Some(sender) = &self.context.event_sender {
            finalizer = finalizer.with_event_sender(sender.clone());
        }
        let (mut finalized, mut failed, mut skipped) = (0, 0, 0);

        for file in files.iter_mut() {
            if file.do_not_update {
                skipped += 1;
            } else {
                match finalizer.finalize(file).await {
                    Ok(_) => {
                        finalized += 1;
                        self.context.emit_install(InstallEvent::FileFinalized {
                            path: file.filename.clone(),
                        });
                    }
                    Err(e) => {
                        failed += 1;
                        self.context.emit_install(InstallEvent::FinalizeFailed {
                            path: file.filename.clone(),
                            failure: FailureContext::from_error(&e),
                        });
                    }
                }
            }
            complete += 1;
            self.context
                .emit_progress_updated(PROGRESS_ID, complete, Some(total));
        }

        osup_root::sync().await?;
        self.context.emit_install(InstallEvent::Synced {
            phase: "finalized".to_string(),
        });

        let expected = self.context.expected_updates.unwrap_or(files.len());
        let report = InstallReport::new(expected, finalized, failed, skipped);
        self.context.emit_install(InstallEvent::Completed {
            expected: report.expected,
            finalized: report.finalized,
            failed: report.failed,
            skipped: report.skipped,
            deficit: report.deficit,
        });
        self.context
            .emit_progress_completed(PROGRESS_ID, started.elapsed());

        Ok(report)
    }

    async fn stage_all(
        &self,
        files: &mut [FileRecord],
        manifest: &Manifest,
        complete: &mut u64,
        total: u64,
    ) -> Result<(), Error> {
        let mut stager = Stager::new(&self.root, self.store.clone(), Arc::clone(&self.copier));
        if let Some(sender) = &self.context.event_sender {
            stager = stager.with_event_sender(sender.clone());
        }
        let manifest_fixer = ManifestPathFixer::new(
            manifest,
            &self.root,
            self.store.clone(),
            Arc::clone(&self.copier),
        );
        let fixer: Option<&dyn PathFixer> = if self.context.no_autofix {
            None
        } else {
            Some(&manifest_fixer)
        };

        for file in files.iter_mut() {
            if !file.do_not_update && !file.is_deleted {
                match stager.stage(file, fixer).await {
                    Ok(outcome) => self.context.emit_install(InstallEvent::FileStaged {
                        path: file.filename.clone(),
                        method: outcome.to_string(),
                    }),
                    Err(e) => {
                        self.context.emit_install(InstallEvent::StagingFailed {
                            path: file.filename.clone(),
                            failure: FailureContext::from_error(&e),
                        });
                        return Err(e);
                    }
                }
            }
            *complete += 1;
            self.context
                .emit_progress_updated(PROGRESS_ID, *complete, Some(total));
        }
        Ok(())
    }
}
