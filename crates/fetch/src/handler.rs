//! Per-pack completion handling for the download session

use crate::pack::PackDescriptor;
use async_trait::async_trait;
use osup_errors::{Error, FetchError};
use osup_events::{EventEmitter, EventSender, FailureContext, FetchEvent};
use osup_net::{DownloadHandler, DownloadRequest, TransferFailure};
use osup_store::ContentStore;
use osup_types::{FailedPack, FetchReport, MissingPack};

/// Collects the outcome of every pack into a [`FetchReport`]
pub(crate) struct PackHandler {
    store: ContentStore,
    required: bool,
    event_sender: Option<EventSender>,
    pub(crate) report: FetchReport,
    /// Bundle and message of the failure that stopped a required batch
    pub(crate) required_failure: Option<(String, String)>,
}

impl EventEmitter for PackHandler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl PackHandler {
    pub(crate) fn new(
        store: ContentStore,
        required: bool,
        event_sender: Option<EventSender>,
        report: FetchReport,
    ) -> Self {
        Self {
            store,
            required,
            event_sender,
            report,
            required_failure: None,
        }
    }

    /// Extract a pack whose archive is in place
    pub(crate) async fn extract(&mut self, pack: &PackDescriptor) -> Result<(), Error> {
        self.store.finalize_pack(&pack.archive).await?;
        self.report.extracted.push(pack.bundle.clone());
        self.emit_fetch(FetchEvent::PackExtracted {
            bundle: pack.bundle.clone(),
        });
        Ok(())
    }

    /// Record a pack the server does not have
    pub(crate) fn record_missing(&mut self, pack: &PackDescriptor) {
        self.emit_fetch(FetchEvent::PackMissing {
            bundle: pack.bundle.clone(),
            url: pack.url.clone(),
        });
        self.report.missing.push(MissingPack {
            bundle: pack.bundle.clone(),
            url: pack.url.clone(),
        });
    }

    /// Record a hard failure; returns whether the batch may continue
    pub(crate) fn record_failure(&mut self, pack: &PackDescriptor, error: &Error) -> bool {
        self.emit_fetch(FetchEvent::PackFailed {
            bundle: pack.bundle.clone(),
            url: pack.url.clone(),
            failure: FailureContext::from_error(error),
        });

        if self.required {
            self.required_failure = Some((pack.bundle.clone(), error.to_string()));
            return false;
        }

        self.report.failed.push(FailedPack {
            bundle: pack.bundle.clone(),
            url: pack.url.clone(),
            message: error.to_string(),
        });
        true
    }
}

#[async_trait]
impl DownloadHandler<PackDescriptor> for PackHandler {
    async fn on_success(&mut self, request: &DownloadRequest<PackDescriptor>) -> Result<(), Error> {
        self.extract(&request.data).await
    }

    fn on_error(
        &mut self,
        request: &DownloadRequest<PackDescriptor>,
        failure: &TransferFailure,
    ) -> bool {
        match pack_error(failure, &request.data.url) {
            Error::Fetch(FetchError::PackNotFound { .. }) => {
                self.record_missing(&request.data);
                true
            }
            error => self.record_failure(&request.data, &error),
        }
    }
}

/// Name a transfer failure in fetch terms
///
/// Handler failures already are (extraction), so they pass through.
fn pack_error(failure: &TransferFailure, url: &str) -> Error {
    match failure {
        TransferFailure::NotFound { .. } => FetchError::PackNotFound {
            url: url.to_string(),
        }
        .into(),
        TransferFailure::Transfer(Error::Network(e)) => FetchError::CouldNotDownloadFile {
            url: url.to_string(),
            message: e.to_string(),
        }
        .into(),
        TransferFailure::Transfer(e) | TransferFailure::Handler(e) => e.clone(),
    }
}
