#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Filesystem operations for osup
//!
//! Thin async wrappers over the operations the staging and finalize steps
//! need. Nothing here follows symlinks unless its name says so, and every
//! failure carries the offending path and the original `io::ErrorKind` so
//! callers can tell "already gone" from a real failure.

use osup_errors::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Result type for filesystem operations
type Result<T> = std::result::Result<T, Error>;

/// Metadata of `path` without following a trailing symlink
pub async fn lstat(path: &Path) -> Option<std::fs::Metadata> {
    fs::symlink_metadata(path).await.ok()
}

/// Check if a path exists, without following a trailing symlink
pub async fn exists(path: &Path) -> bool {
    lstat(path).await.is_some()
}

/// Whether `path` is a real directory (a symlink to one does not count)
pub async fn is_real_dir(path: &Path) -> bool {
    lstat(path).await.is_some_and(|m| m.file_type().is_dir())
}

/// Create a directory with all parent directories
///
/// # Errors
///
/// Returns an error if any component cannot be created.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}

/// Create a single directory with the given mode; an existing one is fine
///
/// # Errors
///
/// Returns an error if the directory cannot be created for any reason other
/// than already existing.
pub async fn create_dir_with_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    let target = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        std::fs::DirBuilder::new().mode(mode).create(&target)
    })
    .await
    .map_err(|e| Error::internal(format!("mkdir task failed: {e}")))?;

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Remove whatever is at `path`, recursively for directories
///
/// A missing path is not an error. Symlinks are removed, never followed.
///
/// # Errors
///
/// Returns an error if removal fails for any other reason.
pub async fn remove_all(path: &Path) -> Result<()> {
    let Some(meta) = lstat(path).await else {
        return Ok(());
    };

    let result = if meta.file_type().is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Remove a single non-directory entry; absence is not an error
///
/// # Errors
///
/// Returns an error if the entry exists and cannot be removed.
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Ensure a directory exists and is empty
///
/// # Errors
///
/// Returns an error if the old tree cannot be removed or the directory
/// cannot be created.
pub async fn ensure_empty_dir(path: &Path) -> Result<()> {
    remove_all(path).await?;
    create_dir_all(path).await
}

/// Rename a file or directory
///
/// # Errors
///
/// Returns an error (tagged with the destination) if the rename fails.
pub async fn rename(src: &Path, dst: &Path) -> Result<()> {
    fs::rename(src, dst)
        .await
        .map_err(|e| Error::io_with_path(&e, dst))
}

/// Create a hard link
///
/// # Errors
///
/// Returns an error if the link cannot be created (cross-device, existing
/// destination, permissions).
pub async fn hard_link(src: &Path, dst: &Path) -> Result<()> {
    fs::hard_link(src, dst)
        .await
        .map_err(|e| Error::io_with_path(&e, dst))
}

/// Resolve `path` to its canonical absolute form
///
/// # Errors
///
/// Returns an error if any component is missing or unreadable.
pub async fn canonicalize(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}

/// Whether the process runs with an effective uid of 0
#[must_use]
pub fn is_superuser() -> bool {
    // geteuid(2) takes no arguments and cannot fail
    #[allow(unsafe_code)]
    let euid = unsafe { libc::geteuid() };
    euid == 0
}

/// Flush all filesystem buffers to stable storage
///
/// # Errors
///
/// Returns an error only if the blocking task cannot be joined.
pub async fn sync() -> Result<()> {
    tokio::task::spawn_blocking(|| {
        // sync(2) takes no arguments and cannot fail
        #[allow(unsafe_code)]
        unsafe {
            libc::sync();
        }
    })
    .await
    .map_err(|e| Error::internal(format!("sync task failed: {e}")))
}
