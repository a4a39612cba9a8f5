//! Batch pack fetching

use crate::handler::PackHandler;
use crate::pack::PackDescriptor;
use crate::registry::{BundleRegistry, TrackingDirRegistry};
use osup_config::Config;
use osup_errors::{ConfigError, Error, FetchError};
use osup_events::{EventEmitter, EventSender, FailureContext, FetchEvent, ProgressEvent};
use osup_net::{DownloadSession, NetClient, NetConfig, SessionProgress};
use osup_store::ContentStore;
use osup_types::{FetchReport, Manifest, Subscription, Version};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const PROGRESS_ID: &str = "fetch-packs";

/// Downloads and extracts the packs a set of subscriptions needs
pub struct PackFetcher {
    client: NetClient,
    store: ContentStore,
    registry: Arc<dyn BundleRegistry>,
    content_url: String,
    mix_state_dir: PathBuf,
    max_parallel_downloads: usize,
    required: bool,
    event_sender: Option<EventSender>,
}

impl EventEmitter for PackFetcher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl PackFetcher {
    /// Create a fetcher for packs served under `content_url`
    ///
    /// Installed bundles are looked up in the default tracking directory
    /// until [`PackFetcher::with_registry`] says otherwise.
    #[must_use]
    pub fn new(client: NetClient, store: ContentStore, content_url: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            client,
            store,
            registry: Arc::new(TrackingDirRegistry::from_config(&defaults)),
            content_url: content_url.into(),
            mix_state_dir: defaults.paths.mix_state_dir,
            max_parallel_downloads: defaults.general.max_parallel_downloads,
            required: false,
            event_sender: None,
        }
    }

    /// Build a fetcher from the merged configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no content URL is configured or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let content_url = config.content_url().ok_or_else(|| ConfigError::MissingField {
            field: "network.content_url".to_string(),
        })?;
        let client = NetClient::new(NetConfig::from_config(config))?;

        Ok(Self::new(
            client,
            ContentStore::new(&config.paths.state_dir),
            content_url,
        )
        .with_registry(TrackingDirRegistry::from_config(config))
        .with_mix_state_dir(config.paths.mix_state_dir.clone())
        .with_max_parallel_downloads(config.general.max_parallel_downloads))
    }

    #[must_use]
    pub fn with_registry(mut self, registry: impl BundleRegistry + 'static) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    #[must_use]
    pub fn with_mix_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mix_state_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_max_parallel_downloads(mut self, max: usize) -> Self {
        self.max_parallel_downloads = max.max(1);
        self
    }

    /// Fail the whole batch on the first pack that cannot be fetched
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Fetch and extract every pack the subscriptions need
    ///
    /// The old version of each subscription whose bundle is not installed is
    /// reset to 0 first. Missing packs never fail the batch; other failures
    /// do only when the fetcher is `required`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBundle` before any transfer when a subscription names
    /// a bundle absent from the manifest, and `RequiredPackFailed` when a
    /// required batch loses a pack.
    pub async fn fetch(
        &self,
        subscriptions: &mut [Subscription],
        manifest: &Manifest,
    ) -> Result<FetchReport, Error> {
        let packs = self.plan(subscriptions, manifest).await?;
        if packs.is_empty() {
            self.emit_fetch(FetchEvent::NothingToFetch);
            return Ok(FetchReport::default());
        }

        self.store.ensure_layout().await?;
        let (mix, remote): (Vec<_>, Vec<_>) = packs.into_iter().partition(|p| p.is_mix);
        let total_bytes = self.probe_total_bytes(&remote).await;
        let pack_count = mix.len() + remote.len();

        self.emit_fetch(FetchEvent::BatchStarted {
            packs: pack_count,
            total_bytes,
        });
        let started = Instant::now();
        match total_bytes {
            Some(bytes) => self.emit(osup_events::AppEvent::Progress(
                ProgressEvent::started_bytes(PROGRESS_ID, "Downloading packs", Some(bytes)),
            )),
            None => self.emit_progress_started(
                PROGRESS_ID,
                "Downloading packs",
                Some(pack_count as u64),
            ),
        }

        let mut handler = PackHandler::new(
            self.store.clone(),
            self.required,
            self.event_sender.clone(),
            FetchReport {
                requested: pack_count,
                total_bytes,
                ..FetchReport::default()
            },
        );

        let outcome = self.run(&mut handler, mix, remote, total_bytes).await;
        let PackHandler {
            report,
            required_failure,
            ..
        } = handler;

        if let Err(err) = outcome {
            let err = match required_failure {
                Some((bundle, message)) => FetchError::RequiredPackFailed { bundle, message }.into(),
                None => err,
            };
            self.emit_progress_failed(PROGRESS_ID, FailureContext::from_error(&err));
            return Err(err);
        }

        if !report.missing.is_empty() {
            self.emit_fetch(FetchEvent::MissingPacks {
                urls: report.missing.iter().map(|m| m.url.clone()).collect(),
            });
        }
        self.emit_fetch(FetchEvent::BatchCompleted {
            extracted: report.extracted.len(),
            missing: report.missing.len(),
            failed: report.failed.len(),
        });
        self.emit_progress_completed(PROGRESS_ID, started.elapsed());

        Ok(report)
    }

    /// Decide which packs to fetch, failing before any transfer on an
    /// unknown bundle
    async fn plan(
        &self,
        subscriptions: &mut [Subscription],
        manifest: &Manifest,
    ) -> Result<Vec<PackDescriptor>, Error> {
        let mut packs = Vec::new();

        for sub in subscriptions.iter_mut() {
            if !self.registry.is_installed(&sub.bundle) {
                sub.old_version = Version::NOT_INSTALLED;
            }
            if !sub.needs_pack() {
                continue;
            }
            if self
                .store
                .has_marker(&sub.bundle, sub.old_version, sub.new_version)
                .await
            {
                self.emit_fetch(FetchEvent::PackAlreadyPresent {
                    bundle: sub.bundle.clone(),
                    from: sub.old_version,
                    to: sub.new_version,
                });
                continue;
            }

            let entry = manifest
                .find_bundle(&sub.bundle)
                .ok_or_else(|| FetchError::InvalidBundle {
                    bundle: sub.bundle.clone(),
                })?;
            packs.push(PackDescriptor::new(
                sub,
                entry.is_mix,
                &self.content_url,
                &self.mix_state_dir,
                &self.store,
            ));
        }

        Ok(packs)
    }

    /// Sum the remote pack sizes; any failed probe means no byte total
    async fn probe_total_bytes(&self, remote: &[PackDescriptor]) -> Option<u64> {
        if remote.is_empty() {
            return None;
        }

        let mut total = 0u64;
        for pack in remote {
            match self.client.content_length(&pack.url).await {
                Ok(size) => total += size,
                Err(e) => {
                    self.emit_debug(format!(
                        "size probe for {} failed ({e}), reporting progress by pack count",
                        pack.url
                    ));
                    return None;
                }
            }
        }
        Some(total)
    }

    async fn run(
        &self,
        handler: &mut PackHandler,
        mix: Vec<PackDescriptor>,
        remote: Vec<PackDescriptor>,
        total_bytes: Option<u64>,
    ) -> Result<(), Error> {
        let total_packs = (mix.len() + remote.len()) as u64;
        let mut mix_done = 0u64;

        for pack in mix {
            self.emit_queued(&pack);
            if let Err(err) = self.fetch_mix_pack(handler, &pack).await {
                if !handler.record_failure(&pack, &err) {
                    return Err(err);
                }
            }
            mix_done += 1;
            if total_bytes.is_none() {
                self.emit_progress_updated(PROGRESS_ID, mix_done, Some(total_packs));
            }
        }

        if remote.is_empty() {
            return Ok(());
        }

        let progress_sender = self.event_sender.clone();
        let mut session =
            DownloadSession::start(self.client.clone(), self.max_parallel_downloads, handler);
        session.set_progress(move |p: SessionProgress| {
            let event = match total_bytes {
                Some(bytes) => ProgressEvent::updated(PROGRESS_ID, p.downloaded_bytes, Some(bytes)),
                None => ProgressEvent::updated(
                    PROGRESS_ID,
                    mix_done + p.completed as u64,
                    Some(total_packs),
                ),
            };
            progress_sender.emit(osup_events::AppEvent::Progress(event));
        });

        for pack in remote {
            self.emit_queued(&pack);
            let (url, dest) = (pack.url.clone(), pack.archive.clone());
            session.enqueue(url, dest, pack).await?;
        }
        session.end().await
    }

    /// Link a locally built mix pack into place and extract it
    async fn fetch_mix_pack(
        &self,
        handler: &mut PackHandler,
        pack: &PackDescriptor,
    ) -> Result<(), Error> {
        let source = PathBuf::from(&pack.url);
        osup_root::remove_file_if_exists(&pack.archive).await?;
        osup_root::hard_link(&source, &pack.archive)
            .await
            .map_err(|e| FetchError::MixPackUnavailable {
                path: pack.url.clone(),
                message: e.to_string(),
            })?;
        handler.extract(pack).await
    }

    fn emit_queued(&self, pack: &PackDescriptor) {
        self.emit_fetch(FetchEvent::PackQueued {
            bundle: pack.bundle.clone(),
            from: pack.from,
            to: pack.to,
            url: pack.url.clone(),
            is_mix: pack.is_mix,
        });
    }
}
