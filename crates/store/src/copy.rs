//! Metadata-preserving tree copies
//!
//! Staging places payloads with the same semantics as `tar -c | tar -x`:
//! the tree lands under its own basename, mode, ownership, mtimes and
//! extended attributes survive, and existing directories are overlaid
//! rather than replaced.

use async_trait::async_trait;
use osup_errors::{Error, StorageError};
use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, HeaderMode};

const XATTR_PAX_PREFIX: &str = "SCHILY.xattr.";

/// Copy a file tree into a directory, keeping all of its metadata
#[async_trait]
pub trait ArchiveCopy: Send + Sync {
    /// Copy `source` to `dest_dir/<basename of source>`
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the copy cannot be
    /// written.
    async fn copy_into(&self, source: &Path, dest_dir: &Path) -> Result<(), Error>;
}

/// [`ArchiveCopy`] built on an in-process tar round trip
///
/// The archive is spooled to an anonymous temporary file so large trees
/// never sit in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarCopier;

impl TarCopier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveCopy for TarCopier {
    async fn copy_into(&self, source: &Path, dest_dir: &Path) -> Result<(), Error> {
        let source = source.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        let privileged = osup_root::is_superuser();

        let (source, dest_dir, result) = tokio::task::spawn_blocking(move || {
            let result = copy_blocking(&source, &dest_dir, privileged);
            (source, dest_dir, result)
        })
        .await
        .map_err(|e| Error::internal(format!("archive copy task failed: {e}")))?;

        result.map_err(|e| {
            StorageError::ArchiveCopy {
                source_path: source.display().to_string(),
                dest: dest_dir.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn copy_blocking(source: &Path, dest_dir: &Path, privileged: bool) -> io::Result<()> {
    let name = source.file_name().map(PathBuf::from).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "source has no file name")
    })?;

    let mut builder = Builder::new(tempfile::tempfile()?);
    builder.mode(HeaderMode::Complete);
    builder.follow_symlinks(false);
    append_tree(&mut builder, source, &name, privileged)?;
    let mut spool = builder.into_inner()?;
    spool.flush()?;
    spool.seek(SeekFrom::Start(0))?;

    let mut archive = Archive::new(spool);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_preserve_ownerships(privileged);
    archive.set_unpack_xattrs(true);
    archive.set_overwrite(true);
    archive.unpack(dest_dir)
}

fn append_tree<W: Write>(
    builder: &mut Builder<W>,
    path: &Path,
    name: &Path,
    privileged: bool,
) -> io::Result<()> {
    let xattrs = read_xattrs(path, privileged)?;
    if !xattrs.is_empty() {
        builder.append_pax_extensions(
            xattrs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_slice())),
        )?;
    }
    builder.append_path_with_name(path, name)?;

    if fs::symlink_metadata(path)?.is_dir() {
        let mut children = fs::read_dir(path)?.collect::<io::Result<Vec<_>>>()?;
        children.sort_by_key(fs::DirEntry::file_name);
        for child in children {
            append_tree(
                builder,
                &child.path(),
                &name.join(child.file_name()),
                privileged,
            )?;
        }
    }
    Ok(())
}

// Unprivileged processes may only write the user namespace.
fn read_xattrs(path: &Path, privileged: bool) -> io::Result<Vec<(String, Vec<u8>)>> {
    let names = match xattr::list(path) {
        Ok(names) => names,
        Err(e) if e.kind() == io::ErrorKind::Unsupported => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut attrs = Vec::new();
    for attr in names {
        let Some(key) = attr.to_str() else {
            continue;
        };
        if !privileged && !key.starts_with("user.") {
            continue;
        }
        if let Some(value) = xattr::get(path, &attr)? {
            attrs.push((format!("{XATTR_PAX_PREFIX}{key}"), value));
        }
    }
    Ok(attrs)
}
