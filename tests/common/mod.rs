//! Shared fixtures for pipeline tests
//!
//! A `TestEnvironment` owns an install root, a state directory and a mock
//! content server; `PackBuilder` produces the zstd tarballs the server hands
//! out.

use httpmock::prelude::*;
use httpmock::Mock;
use osup_config::Config;
use osup_types::{BundleEntry, FileRecord, Manifest, Version};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builds a pack archive laid out the way the server publishes them
pub struct PackBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl PackBuilder {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    pub fn dir(mut self, hash: &str, mode: u32) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(mode);
        header.set_size(0);
        self.builder
            .append_data(&mut header, format!("staged/{hash}/"), std::io::empty())
            .unwrap();
        self
    }

    pub fn file(mut self, hash: &str, mode: u32, contents: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_mode(mode);
        header.set_size(contents.len() as u64);
        self.builder
            .append_data(&mut header, format!("staged/{hash}"), contents)
            .unwrap();
        self
    }

    pub fn symlink(mut self, hash: &str, target: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_mode(0o777);
        header.set_size(0);
        self.builder
            .append_link(&mut header, format!("staged/{hash}"), target)
            .unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let tar = self.builder.into_inner().unwrap();
        zstd::encode_all(tar.as_slice(), 3).unwrap()
    }
}

pub struct TestEnvironment {
    _temp: TempDir,
    pub root: PathBuf,
    pub state: PathBuf,
    pub server: MockServer,
    pub config: Config,
}

impl TestEnvironment {
    /// Sandbox with `installed` bundles recorded in the tracking directory
    pub async fn new(installed: &[&str]) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let state = temp.path().join("state");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&state).unwrap();
        let server = MockServer::start_async().await;

        let mut config = Config::default();
        config.paths.install_root.clone_from(&root);
        config.paths.state_dir.clone_from(&state);
        config.paths.mix_state_dir = temp.path().join("mix");
        config.network.content_url = Some(server.base_url());
        config.network.retries = 1;
        config.network.retry_delay = 0;
        config.validate(true).unwrap();

        let tracking = config.bundles_path();
        std::fs::create_dir_all(&tracking).unwrap();
        for bundle in installed {
            std::fs::write(tracking.join(bundle), b"").unwrap();
        }

        Self {
            _temp: temp,
            root,
            state,
            server,
            config,
        }
    }

    /// Serve `body` as the pack taking `bundle` from `from` to `to`
    pub async fn serve_pack(&self, bundle: &str, from: u32, to: u32, body: Vec<u8>) -> Mock<'_> {
        let path = format!("/{to}/pack-{bundle}-from-{from}.tar");
        self.server
            .mock_async(move |when, then| {
                when.method(GET).path(path);
                then.status(200).body(body);
            })
            .await
    }

    pub fn live(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    pub fn staged(&self, hash: &str) -> PathBuf {
        self.state.join("staged").join(hash)
    }
}

pub fn manifest(version: u32, bundles: &[&str], files: &[FileRecord]) -> Manifest {
    Manifest {
        version: Version(version),
        bundles: bundles
            .iter()
            .map(|name| BundleEntry {
                name: (*name).to_string(),
                version: Version(version),
                is_mix: false,
            })
            .collect(),
        files: files.to_vec(),
    }
}

pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::symlink_metadata(path).unwrap().permissions().mode() & 0o7777
}
