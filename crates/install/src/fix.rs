//! Recreation of missing target directories

use crate::staging::place_directory;
use async_trait::async_trait;
use osup_errors::{Error, InstallError};
use osup_store::{ArchiveCopy, ContentStore};
use osup_types::Manifest;
use std::path::PathBuf;
use std::sync::Arc;

/// Recreates a missing directory before a file is staged into it
#[async_trait]
pub trait PathFixer: Send + Sync {
    /// Make the absolute manifest path `dir` exist under the install root
    ///
    /// # Errors
    ///
    /// Returns an error if any missing ancestor cannot be recreated.
    async fn fix_path(&self, dir: &str) -> Result<(), Error>;
}

/// Rebuilds directories from their records in the manifest
///
/// Every missing ancestor must be a live directory record whose payload is
/// in the content store; it is then placed exactly as staging places a
/// directory.
pub struct ManifestPathFixer<'m> {
    manifest: &'m Manifest,
    root: PathBuf,
    store: ContentStore,
    copier: Arc<dyn ArchiveCopy>,
}

impl<'m> ManifestPathFixer<'m> {
    #[must_use]
    pub fn new(
        manifest: &'m Manifest,
        root: impl Into<PathBuf>,
        store: ContentStore,
        copier: Arc<dyn ArchiveCopy>,
    ) -> Self {
        Self {
            manifest,
            root: root.into(),
            store,
            copier,
        }
    }
}

#[async_trait]
impl PathFixer for ManifestPathFixer<'_> {
    async fn fix_path(&self, dir: &str) -> Result<(), Error> {
        let mut current = String::new();
        let mut parent = self.root.clone();

        for component in dir.split('/').filter(|c| !c.is_empty()) {
            current.push('/');
            current.push_str(component);
            let target = parent.join(component);

            match osup_root::lstat(&target).await {
                Some(meta) if meta.file_type().is_dir() => {}
                Some(_) => {
                    return Err(cannot_create(&current, "exists and is not a directory"));
                }
                None => {
                    let record = self
                        .manifest
                        .find_file(&current)
                        .filter(|r| r.is_dir())
                        .ok_or_else(|| cannot_create(&current, "no directory record in manifest"))?;
                    if !self.store.has_content(&record.hash).await {
                        return Err(cannot_create(&current, "payload not in content store"));
                    }
                    place_directory(
                        &self.store,
                        self.copier.as_ref(),
                        &record.hash,
                        component,
                        &parent,
                    )
                    .await?;
                }
            }
            parent = target;
        }

        Ok(())
    }
}

fn cannot_create(path: &str, message: &str) -> Error {
    InstallError::CouldNotCreateDir {
        path: path.to_string(),
        message: message.to_string(),
    }
    .into()
}
