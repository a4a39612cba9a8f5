//! Event handling for the terminal

use crate::logging::log_event_with_tracing;
use console::{style, Term};
use osup_events::{AppEvent, EventLevel, FetchEvent, GeneralEvent, InstallEvent};

/// Logs every event and echoes the ones a person at a terminal cares about
pub struct EventHandler {
    /// Suppress terminal output (JSON mode)
    quiet: bool,
    term: Term,
}

impl EventHandler {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            term: Term::stderr(),
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: &AppEvent) {
        log_event_with_tracing(event);

        if self.quiet {
            return;
        }
        if let Some(line) = status_line(event) {
            let line = match event.level() {
                EventLevel::Error => style(line).red().to_string(),
                EventLevel::Warn => style(line).yellow().to_string(),
                _ => line,
            };
            let _ = self.term.write_line(&line);
        }
    }
}

/// Short human summary of an event, if it deserves one
fn status_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::General(GeneralEvent::Warning { message, .. }) => {
            Some(format!("warning: {message}"))
        }
        AppEvent::Fetch(FetchEvent::BatchStarted { packs, total_bytes }) => Some(match total_bytes {
            Some(bytes) => format!("Fetching {packs} packs ({bytes} bytes)"),
            None => format!("Fetching {packs} packs"),
        }),
        AppEvent::Fetch(FetchEvent::NothingToFetch) => Some("No packs to fetch".to_string()),
        AppEvent::Fetch(FetchEvent::PackFailed {
            bundle, failure, ..
        }) => Some(format!("Pack for {bundle} failed: {}", failure.message)),
        AppEvent::Fetch(FetchEvent::MissingPacks { urls }) => {
            let mut line = format!("{} packs not available on the server:", urls.len());
            for url in urls {
                line.push_str("\n  ");
                line.push_str(url);
            }
            Some(line)
        }
        AppEvent::Install(InstallEvent::StagingStarted { files }) => {
            Some(format!("Staging {files} files"))
        }
        AppEvent::Install(InstallEvent::StagingFailed { path, failure }) => {
            Some(format!("Could not stage {path}: {}", failure.message))
        }
        AppEvent::Install(InstallEvent::AutoFixDisabled { directory }) => Some(format!(
            "Directory {directory} is missing and auto-fix is disabled"
        )),
        AppEvent::Install(InstallEvent::FinalizeFailed { path, failure }) => {
            Some(format!("Could not finalize {path}: {}", failure.message))
        }
        AppEvent::Install(InstallEvent::MovedToLostFound { path, destination }) => Some(format!(
            "Moved directory at {path} to {}",
            destination.display()
        )),
        AppEvent::Install(InstallEvent::DeletionSkipped { path, reason }) => {
            Some(format!("Did not delete {path}: {reason}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osup_events::FailureContext;

    #[test]
    fn missing_packs_listed_together() {
        let line = status_line(&AppEvent::Fetch(FetchEvent::MissingPacks {
            urls: vec!["http://a/11/pack-x-from-10.tar".into(), "http://a/11/pack-y-from-10.tar".into()],
        }))
        .unwrap();
        assert!(line.starts_with("2 packs"));
        assert_eq!(line.lines().count(), 3);
    }

    #[test]
    fn routine_events_stay_quiet() {
        assert!(status_line(&AppEvent::Install(InstallEvent::FileFinalized {
            path: "/usr/bin/tool".into()
        }))
        .is_none());
    }

    #[test]
    fn failure_message_surfaces() {
        let line = status_line(&AppEvent::Install(InstallEvent::StagingFailed {
            path: "/etc/x".into(),
            failure: FailureContext {
                code: None,
                message: "disk full".into(),
                hint: None,
                retryable: false,
            },
        }))
        .unwrap();
        assert_eq!(line, "Could not stage /etc/x: disk full");
    }
}
