//! End-to-end tests: fetch packs from a mock server, then stage and
//! finalize the files they carry onto a sandboxed root.

mod common;

use common::{manifest, mode_of, PackBuilder, TestEnvironment};
use osup_events::{AppEvent, EventReceiver, InstallEvent};
use osup_fetch::PackFetcher;
use osup_install::{InstallContext, Installer};
use osup_store::ContentStore;
use osup_types::{FetchReport, FileRecord, InstallReport, Subscription, Version};

fn bundle_files() -> Vec<FileRecord> {
    vec![
        FileRecord::directory("/usr/bin", "d-bin"),
        FileRecord::regular("/usr/bin/tool", "h-tool"),
        FileRecord::symlink("/usr/bin/tool-link", "h-link"),
        FileRecord::regular("/etc/tool.conf", "h-conf"),
    ]
}

fn bundle_pack() -> Vec<u8> {
    PackBuilder::new()
        .dir("d-bin", 0o755)
        .file("h-tool", 0o755, b"#!/bin/sh\necho 11\n")
        .symlink("h-link", "tool")
        .file("h-conf", 0o644, b"level = 11\n")
        .finish()
}

async fn update(
    env: &TestEnvironment,
    files: &mut [FileRecord],
) -> (FetchReport, InstallReport) {
    let manifest = manifest(11, &["bundleX"], files);
    let mut subs = vec![Subscription::new("bundleX", Version(10), Version(11))];

    let fetch = PackFetcher::from_config(&env.config)
        .unwrap()
        .fetch(&mut subs, &manifest)
        .await
        .unwrap();
    assert!(fetch.failed.is_empty());
    assert!(fetch.missing.is_empty());

    let install = Installer::new(
        &env.root,
        ContentStore::new(&env.state),
        InstallContext::new(),
    )
    .await
    .unwrap()
    .install_files(files, &manifest)
    .await
    .unwrap();
    (fetch, install)
}

fn install_events(rx: &mut EventReceiver) -> Vec<InstallEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::Install(event) = event {
            events.push(event);
        }
    }
    events
}

#[tokio::test]
async fn test_fetch_stage_finalize_single_bundle() {
    let env = TestEnvironment::new(&["bundleX"]).await;
    std::fs::create_dir_all(env.live("/etc")).unwrap();
    let pack = env.serve_pack("bundleX", 10, 11, bundle_pack()).await;

    let mut files = bundle_files();
    let (fetch, report) = update(&env, &mut files).await;

    assert_eq!(fetch.requested, 1);
    assert_eq!(fetch.extracted, vec!["bundleX".to_string()]);
    assert_eq!(pack.hits_async().await, 1);
    assert_eq!(report.deficit, 0);
    assert_eq!(report.finalized, files.len());
    assert!(env.state.join("pack-bundleX-from-10-to-11.tar").exists());

    assert_eq!(
        std::fs::read(env.live("/usr/bin/tool")).unwrap(),
        b"#!/bin/sh\necho 11\n"
    );
    assert_eq!(mode_of(&env.live("/usr/bin/tool")), 0o755);
    assert_eq!(
        std::fs::read_link(env.live("/usr/bin/tool-link")).unwrap(),
        std::path::Path::new("tool")
    );
    assert_eq!(
        std::fs::read_to_string(env.live("/etc/tool.conf")).unwrap(),
        "level = 11\n"
    );

    // No staged temporaries survive a successful install
    for dir in ["/usr/bin", "/etc"] {
        for entry in std::fs::read_dir(env.live(dir)).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(!name.to_string_lossy().starts_with(".update."), "{name:?}");
        }
    }
    assert!(files.iter().all(|f| f.staging.is_none()));
}

#[tokio::test]
async fn test_rerun_is_harmless() {
    let env = TestEnvironment::new(&["bundleX"]).await;
    std::fs::create_dir_all(env.live("/etc")).unwrap();
    let pack = env.serve_pack("bundleX", 10, 11, bundle_pack()).await;

    let (_, first) = update(&env, &mut bundle_files()).await;
    let (refetch, second) = update(&env, &mut bundle_files()).await;

    // the completion marker keeps the second run off the network
    assert_eq!(refetch.requested, 0);
    assert_eq!(pack.hits_async().await, 1);
    assert_eq!(first, second);
    assert_eq!(second.deficit, 0);
    assert!(env.staged("h-tool").exists());
    assert_eq!(
        std::fs::read(env.live("/usr/bin/tool")).unwrap(),
        b"#!/bin/sh\necho 11\n"
    );
}

#[tokio::test]
async fn test_missing_pack_leaves_root_untouched() {
    let env = TestEnvironment::new(&["bundleX"]).await;
    std::fs::create_dir_all(env.live("/etc")).unwrap();
    std::fs::write(env.live("/etc/tool.conf"), "level = 10\n").unwrap();

    let mut files = vec![
        FileRecord::regular("/etc/tool.conf", "h-conf"),
        FileRecord::regular("/etc/zz-new", "h-new"),
    ];
    let manifest = manifest(11, &["bundleX"], &files);
    let mut subs = vec![Subscription::new("bundleX", Version(10), Version(11))];

    let fetch = PackFetcher::from_config(&env.config)
        .unwrap()
        .fetch(&mut subs, &manifest)
        .await
        .unwrap();
    assert_eq!(fetch.missing.len(), 1);

    let (tx, mut rx) = osup_events::channel();
    let result = Installer::new(
        &env.root,
        ContentStore::new(&env.state),
        InstallContext::new().with_event_sender(tx),
    )
    .await
    .unwrap()
    .install_files(&mut files, &manifest)
    .await;

    assert!(matches!(
        result,
        Err(osup_errors::Error::Install(
            osup_errors::InstallError::CouldNotRenameFile { .. }
        ))
    ));
    assert_eq!(
        std::fs::read_to_string(env.live("/etc/tool.conf")).unwrap(),
        "level = 10\n"
    );
    assert!(!env.live("/etc/zz-new").exists());
    let events = install_events(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, InstallEvent::StagingFailed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, InstallEvent::FileFinalized { .. })));
}

#[tokio::test]
async fn test_new_bundle_fetches_full_pack() {
    let env = TestEnvironment::new(&[]).await;
    std::fs::create_dir_all(env.live("/etc")).unwrap();
    env.serve_pack("bundleX", 0, 11, bundle_pack()).await;

    let mut files = bundle_files();
    let manifest = manifest(11, &["bundleX"], &files);
    let mut subs = vec![Subscription::new("bundleX", Version(10), Version(11))];

    let fetch = PackFetcher::from_config(&env.config)
        .unwrap()
        .fetch(&mut subs, &manifest)
        .await
        .unwrap();
    assert_eq!(subs[0].old_version, Version::NOT_INSTALLED);
    assert_eq!(fetch.extracted, vec!["bundleX".to_string()]);

    let report = Installer::new(
        &env.root,
        ContentStore::new(&env.state),
        InstallContext::new(),
    )
    .await
    .unwrap()
    .install_files(&mut files, &manifest)
    .await
    .unwrap();
    assert!(report.is_success());
    assert!(env.live("/usr/bin/tool").is_file());
}
