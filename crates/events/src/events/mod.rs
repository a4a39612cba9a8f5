use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use osup_errors::UserFacingError;

/// Error details carried inside failure events
///
/// Events must be `Clone` and serializable, so the error itself is flattened
/// into the parts the CLI and the JSON log show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Dotted code such as `install.could_not_rename_file`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod fetch;
pub mod general;
pub mod install;
pub mod progress;

pub use fetch::*;
pub use general::*;
pub use install::*;
pub use progress::*;

/// Every event the pipeline emits, tagged by domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Warnings and debug notes outside a specific stage
    General(GeneralEvent),

    Progress(ProgressEvent),

    /// Pack download and extraction
    Fetch(FetchEvent),

    /// Staging, durability barriers and finalization
    Install(InstallEvent),
}

impl AppEvent {
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Progress(_) => EventSource::PROGRESS,
            Self::Fetch(_) => EventSource::FETCH,
            Self::Install(_) => EventSource::INSTALL,
        }
    }

    /// Severity of this event
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Progress(ProgressEvent::Failed { .. })
            | Self::Fetch(FetchEvent::PackFailed { .. })
            | Self::Install(
                InstallEvent::StagingFailed { .. } | InstallEvent::FinalizeFailed { .. },
            ) => EventLevel::Error,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Fetch(FetchEvent::PackMissing { .. } | FetchEvent::MissingPacks { .. })
            | Self::Install(
                InstallEvent::MovedToLostFound { .. }
                | InstallEvent::DeletionSkipped { .. }
                | InstallEvent::AutoFixDisabled { .. },
            ) => EventLevel::Warn,

            Self::Install(InstallEvent::Completed { deficit, .. }) if *deficit > 0 => {
                EventLevel::Warn
            }

            Self::General(GeneralEvent::Debug { .. })
            | Self::Progress(ProgressEvent::Updated { .. })
            | Self::Fetch(FetchEvent::PackAlreadyPresent { .. })
            | Self::Install(InstallEvent::FileStaged { .. } | InstallEvent::FileFinalized { .. }) => {
                EventLevel::Debug
            }

            _ => EventLevel::Info,
        }
    }

    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        self.level().into()
    }
}
