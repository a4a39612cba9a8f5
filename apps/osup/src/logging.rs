//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so the
//! JSON log carries the same information the events do.

use osup_events::{AppEvent, FetchEvent, GeneralEvent, InstallEvent, ProgressEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.event_source();
    let source = source.as_str();

    match event {
        AppEvent::General(general) => log_general(source, general),
        AppEvent::Progress(progress) => log_progress(source, progress),
        AppEvent::Fetch(fetch) => log_fetch(source, fetch),
        AppEvent::Install(install) => log_install(source, install),
    }
}

fn log_general(source: &str, event: &GeneralEvent) {
    match event {
        GeneralEvent::Warning { message, context } => {
            warn!(source, context = ?context, "{message}");
        }
        GeneralEvent::Debug { message } => debug!(source, "{message}"),
    }
}

fn log_progress(source: &str, event: &ProgressEvent) {
    match event {
        ProgressEvent::Started {
            id,
            operation,
            total,
            unit,
        } => {
            info!(source, id = %id, operation = %operation, total = ?total, unit = ?unit, "Progress started");
        }
        ProgressEvent::Updated { id, current, total } => {
            debug!(source, id = %id, current, total = ?total, "Progress");
        }
        ProgressEvent::Completed { id, duration } => {
            info!(source, id = %id, duration = ?duration, "Progress completed");
        }
        ProgressEvent::Failed { id, failure } => {
            error!(
                source,
                id = %id,
                code = ?failure.code,
                message = %failure.message,
                "Progress failed"
            );
        }
    }
}

fn log_fetch(source: &str, event: &FetchEvent) {
    match event {
        FetchEvent::NothingToFetch => info!(source, "No packs to fetch"),
        FetchEvent::BatchStarted { packs, total_bytes } => {
            info!(source, packs, total_bytes = ?total_bytes, "Pack fetch started");
        }
        FetchEvent::PackQueued {
            bundle,
            from,
            to,
            url,
            is_mix,
        } => {
            debug!(source, bundle = %bundle, from = %from, to = %to, url = %url, is_mix, "Pack queued");
        }
        FetchEvent::PackAlreadyPresent { bundle, from, to } => {
            debug!(source, bundle = %bundle, from = %from, to = %to, "Pack already extracted");
        }
        FetchEvent::PackExtracted { bundle } => {
            info!(source, bundle = %bundle, "Pack extracted");
        }
        FetchEvent::PackMissing { bundle, url } => {
            warn!(source, bundle = %bundle, url = %url, "Pack not on server");
        }
        FetchEvent::PackFailed {
            bundle,
            url,
            failure,
        } => {
            error!(
                source,
                bundle = %bundle,
                url = %url,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Pack failed"
            );
        }
        FetchEvent::MissingPacks { urls } => {
            warn!(source, count = urls.len(), urls = ?urls, "Packs missing from server");
        }
        FetchEvent::BatchCompleted {
            extracted,
            missing,
            failed,
        } => {
            info!(source, extracted, missing, failed, "Pack fetch completed");
        }
    }
}

fn log_install(source: &str, event: &InstallEvent) {
    match event {
        InstallEvent::StagingStarted { files } => info!(source, files, "Staging started"),
        InstallEvent::FileStaged { path, method } => {
            debug!(source, path = %path, method = %method, "File staged");
        }
        InstallEvent::StagingFailed { path, failure } => {
            error!(
                source,
                path = %path,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Staging failed"
            );
        }
        InstallEvent::AutoFixDisabled { directory } => {
            warn!(source, directory = %directory, "Target directory missing and auto-fix disabled");
        }
        InstallEvent::Synced { phase } => info!(source, phase = %phase, "Filesystem synced"),
        InstallEvent::FileFinalized { path } => debug!(source, path = %path, "File finalized"),
        InstallEvent::FinalizeFailed { path, failure } => {
            error!(
                source,
                path = %path,
                code = ?failure.code,
                message = %failure.message,
                "Finalize failed"
            );
        }
        InstallEvent::MovedToLostFound { path, destination } => {
            warn!(source, path = %path, destination = %destination.display(), "Moved to lost+found");
        }
        InstallEvent::DeletionSkipped { path, reason } => {
            warn!(source, path = %path, reason = %reason, "Deletion skipped");
        }
        InstallEvent::Completed {
            expected,
            finalized,
            failed,
            skipped,
            deficit,
        } => {
            if *deficit > 0 {
                warn!(source, expected, finalized, failed, skipped, deficit, "Install incomplete");
            } else {
                info!(source, expected, finalized, failed, skipped, "Install completed");
            }
        }
    }
}
