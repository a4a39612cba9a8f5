//! Pack archive extraction
//!
//! Packs arrive as tar streams, optionally compressed. The compression is
//! sniffed from the leading bytes rather than trusted from the file name,
//! since a pack is always called `*.tar` whatever it contains.

use osup_errors::{Error, StorageError};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path};
use tar::{Archive, EntryType};

const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
const XZ_MAGIC: &[u8] = &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_OFFSET: usize = 257;

/// Compression wrapped around a pack's tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zstd,
    Xz,
    Gzip,
    Tar,
}

impl ArchiveFormat {
    /// Identify the format from the first bytes of an archive
    #[must_use]
    pub fn detect(header: &[u8]) -> Option<Self> {
        if header.starts_with(ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else if header.starts_with(XZ_MAGIC) {
            Some(Self::Xz)
        } else if header.starts_with(GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if header
            .get(USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len())
            .is_some_and(|magic| magic == USTAR_MAGIC)
        {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Extract the archive at `path` into `dest`
///
/// Permissions, mtimes and extended attributes are restored, and ownership
/// too when running as root. Entries that would land outside `dest` fail
/// the whole extraction.
///
/// # Errors
///
/// Returns an error if the format is not recognized, an entry is unsafe, or
/// any entry cannot be written.
pub async fn extract_archive(path: &Path, dest: &Path) -> Result<(), Error> {
    osup_root::create_dir_all(dest).await?;

    let path = path.to_path_buf();
    let dest = dest.to_path_buf();
    let preserve_ownership = osup_root::is_superuser();

    tokio::task::spawn_blocking(move || extract_blocking(&path, &dest, preserve_ownership))
        .await
        .map_err(|e| Error::internal(format!("extract task failed: {e}")))?
}

fn extract_blocking(path: &Path, dest: &Path, preserve_ownership: bool) -> Result<(), Error> {
    let file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let header = reader.fill_buf().map_err(|e| Error::io_with_path(&e, path))?;

    let stream: Box<dyn Read> = match ArchiveFormat::detect(header) {
        Some(ArchiveFormat::Zstd) => {
            Box::new(zstd::Decoder::with_buffer(reader).map_err(|e| Error::io_with_path(&e, path))?)
        }
        Some(ArchiveFormat::Xz) => Box::new(xz2::read::XzDecoder::new(reader)),
        Some(ArchiveFormat::Gzip) => Box::new(flate2::read::GzDecoder::new(reader)),
        Some(ArchiveFormat::Tar) => Box::new(reader),
        None => {
            return Err(StorageError::UnknownArchiveFormat {
                path: path.display().to_string(),
            }
            .into())
        }
    };

    let mut archive = Archive::new(stream);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_preserve_ownerships(preserve_ownership);
    archive.set_unpack_xattrs(true);
    archive.set_overwrite(true);

    // Directories are applied last so their mtimes and modes survive the
    // creation of their children.
    let mut directories = Vec::new();
    for entry in archive.entries().map_err(|e| Error::io_with_path(&e, path))? {
        let mut entry = entry.map_err(|e| Error::io_with_path(&e, path))?;
        let entry_path = entry
            .path()
            .map_err(|e| Error::io_with_path(&e, path))?
            .into_owned();
        check_entry_path(&entry_path)?;

        if entry.header().entry_type() == EntryType::Directory {
            directories.push(entry);
            continue;
        }
        unpack_entry(&mut entry, &entry_path, dest)?;
    }

    for mut entry in directories.into_iter().rev() {
        let entry_path = entry
            .path()
            .map_err(|e| Error::io_with_path(&e, path))?
            .into_owned();
        unpack_entry(&mut entry, &entry_path, dest)?;
    }

    Ok(())
}

fn unpack_entry<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    entry_path: &Path,
    dest: &Path,
) -> Result<(), Error> {
    let unpacked = entry
        .unpack_in(dest)
        .map_err(|e| Error::io_with_path(&e, dest.join(entry_path)))?;
    if unpacked {
        Ok(())
    } else {
        Err(unsafe_entry(entry_path))
    }
}

fn check_entry_path(entry_path: &Path) -> Result<(), Error> {
    let escapes = entry_path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        Err(unsafe_entry(entry_path))
    } else {
        Ok(())
    }
}

fn unsafe_entry(entry_path: &Path) -> Error {
    StorageError::UnsafeArchiveEntry {
        entry: entry_path.display().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_compressed_formats() {
        assert_eq!(
            ArchiveFormat::detect(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]),
            Some(ArchiveFormat::Zstd)
        );
        assert_eq!(
            ArchiveFormat::detect(&[0xFD, b'7', b'z', b'X', b'Z', 0x00, 0x04]),
            Some(ArchiveFormat::Xz)
        );
        assert_eq!(
            ArchiveFormat::detect(&[0x1F, 0x8B, 0x08]),
            Some(ArchiveFormat::Gzip)
        );
    }

    #[test]
    fn test_detect_plain_tar() {
        let mut block = vec![0u8; 512];
        block[USTAR_OFFSET..USTAR_OFFSET + 5].copy_from_slice(b"ustar");
        assert_eq!(ArchiveFormat::detect(&block), Some(ArchiveFormat::Tar));
    }

    #[test]
    fn test_detect_rejects_garbage() {
        assert_eq!(ArchiveFormat::detect(b"not an archive"), None);
        assert_eq!(ArchiveFormat::detect(&[]), None);
    }

    #[test]
    fn test_entry_paths_cannot_escape() {
        assert!(check_entry_path(Path::new("staged/abc")).is_ok());
        assert!(check_entry_path(Path::new("./staged/abc")).is_ok());
        for bad in ["../etc/passwd", "staged/../../etc", "/etc/passwd"] {
            assert!(matches!(
                check_entry_path(Path::new(bad)),
                Err(Error::Storage(StorageError::UnsafeArchiveEntry { .. }))
            ));
        }
    }
}
