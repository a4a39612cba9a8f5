//! Integration tests for store crate

#[cfg(test)]
mod tests {
    use osup_errors::{Error, FetchError, StorageError};
    use osup_store::*;
    use osup_types::Version;
    use std::io::Write;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::path::Path;
    use tempfile::tempdir;
    use tokio::fs;

    fn tar_bytes(entries: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for dir in dirs {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder
                .append_data(&mut header, dir, std::io::empty())
                .unwrap();
        }
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_mode(0o644);
            header.set_mtime(1_600_000_000);
            header.set_size(data.len() as u64);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_finalize_pack_extracts_and_leaves_marker() {
        let temp = tempdir().unwrap();
        let store = ContentStore::new(temp.path());
        let archive = store.pack_archive_path("editors", Version(10), Version(11));

        let pack = tar_bytes(
            &[("staged/f00d", b"new contents"), ("staged/cafe/inner", b"x")],
            &["staged", "staged/cafe"],
        );
        fs::write(&archive, zstd::encode_all(pack.as_slice(), 3).unwrap())
            .await
            .unwrap();

        store.finalize_pack(&archive).await.unwrap();

        assert!(store.has_content("f00d").await);
        assert!(store.has_content("cafe").await);
        assert_eq!(
            fs::read(store.staged_path("f00d")).await.unwrap(),
            b"new contents"
        );
        let meta = fs::metadata(store.staged_path("f00d")).await.unwrap();
        assert_eq!(meta.mtime(), 1_600_000_000);
        assert!(store.has_marker("editors", Version(10), Version(11)).await);
    }

    #[tokio::test]
    async fn test_extract_gzip_and_plain_tar() {
        let temp = tempdir().unwrap();
        let pack = tar_bytes(&[("staged/beef", b"payload")], &[]);

        let gz = temp.path().join("a.tar");
        fs::write(&gz, gzip(&pack)).await.unwrap();
        extract_archive(&gz, &temp.path().join("out-gz")).await.unwrap();
        assert!(temp.path().join("out-gz/staged/beef").exists());

        let plain = temp.path().join("b.tar");
        fs::write(&plain, &pack).await.unwrap();
        extract_archive(&plain, &temp.path().join("out-tar"))
            .await
            .unwrap();
        assert!(temp.path().join("out-tar/staged/beef").exists());
    }

    #[tokio::test]
    async fn test_failed_extraction_removes_archive_without_marker() {
        let temp = tempdir().unwrap();
        let store = ContentStore::new(temp.path());
        let archive = store.pack_archive_path("broken", Version(1), Version(2));
        fs::write(&archive, b"this is not an archive").await.unwrap();

        let err = store.finalize_pack(&archive).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch(FetchError::ExtractionFailed { .. })
        ));
        assert!(!archive.exists());
        assert!(!store.has_marker("broken", Version(1), Version(2)).await);
    }

    #[tokio::test]
    async fn test_traversal_entry_is_rejected() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("state");

        let mut header = tar::Header::new_old();
        let name = b"../escaped";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_mode(0o644);
        header.set_size(4);
        header.set_cksum();
        let mut builder = tar::Builder::new(Vec::new());
        builder.append(&header, &b"evil"[..]).unwrap();
        let bytes = gzip(&builder.into_inner().unwrap());

        let archive = temp.path().join("evil.tar");
        fs::write(&archive, bytes).await.unwrap();

        let err = extract_archive(&archive, &dest).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::UnsafeArchiveEntry { .. })
        ));
        assert!(!temp.path().join("escaped").exists());
    }

    #[tokio::test]
    async fn test_tar_copier_places_file_under_basename() {
        let temp = tempdir().unwrap();
        let src = temp.path().join(".update.tool");
        fs::write(&src, b"#!/bin/sh\n").await.unwrap();
        fs::set_permissions(&src, std::fs::Permissions::from_mode(0o750))
            .await
            .unwrap();
        let target = temp.path().join("usr/bin");
        fs::create_dir_all(&target).await.unwrap();

        TarCopier::new().copy_into(&src, &target).await.unwrap();

        let copied = target.join(".update.tool");
        assert_eq!(fs::read(&copied).await.unwrap(), b"#!/bin/sh\n");
        let meta = fs::metadata(&copied).await.unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o750);
        assert_eq!(
            meta.mtime(),
            fs::metadata(&src).await.unwrap().mtime()
        );
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_tar_copier_overlays_directories_and_keeps_symlinks() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("scratch/share");
        fs::create_dir_all(src.join("doc")).await.unwrap();
        fs::write(src.join("doc/readme"), b"new").await.unwrap();
        fs::symlink("doc/readme", src.join("link")).await.unwrap();

        let dest = temp.path().join("root/usr");
        fs::create_dir_all(dest.join("share")).await.unwrap();
        fs::write(dest.join("share/existing"), b"keep").await.unwrap();

        TarCopier::new().copy_into(&src, &dest).await.unwrap();

        assert_eq!(fs::read(dest.join("share/existing")).await.unwrap(), b"keep");
        assert_eq!(fs::read(dest.join("share/doc/readme")).await.unwrap(), b"new");
        let link = fs::symlink_metadata(dest.join("share/link")).await.unwrap();
        assert!(link.file_type().is_symlink());
        assert_eq!(
            fs::read_link(dest.join("share/link")).await.unwrap(),
            Path::new("doc/readme")
        );
    }

    #[tokio::test]
    async fn test_tar_copier_preserves_user_xattrs() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("labelled");
        fs::write(&src, b"data").await.unwrap();
        if xattr::set(&src, "user.osup.test", b"kept").is_err() {
            // filesystem without user xattr support
            return;
        }
        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).await.unwrap();

        TarCopier::new().copy_into(&src, &dest).await.unwrap();

        assert_eq!(
            xattr::get(dest.join("labelled"), "user.osup.test").unwrap(),
            Some(b"kept".to_vec())
        );
    }

    #[tokio::test]
    async fn test_tar_copier_reports_missing_source() {
        let temp = tempdir().unwrap();
        let err = TarCopier::new()
            .copy_into(&temp.path().join("absent"), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::ArchiveCopy { .. })
        ));
    }
}
