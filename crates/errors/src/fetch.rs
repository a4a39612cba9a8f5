//! Pack fetching error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("bundle {bundle} is not listed in the manifest")]
    InvalidBundle { bundle: String },

    #[error("could not download {url}: {message}")]
    CouldNotDownloadFile { url: String, message: String },

    #[error("pack not found on server: {url}")]
    PackNotFound { url: String },

    #[error("failed to extract {archive}: {message}")]
    ExtractionFailed { archive: String, message: String },

    #[error("required pack {bundle} could not be fetched: {message}")]
    RequiredPackFailed { bundle: String, message: String },

    #[error("mix pack {path} is unavailable: {message}")]
    MixPackUnavailable { path: String, message: String },
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidBundle { .. } => {
                Some("Check the bundle subscription list against the current manifest.")
            }
            Self::CouldNotDownloadFile { .. } | Self::RequiredPackFailed { .. } => {
                Some("Check your network connection and retry the update.")
            }
            Self::ExtractionFailed { .. } => {
                Some("Ensure the state directory has free space and retry; the pack will be fetched again.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CouldNotDownloadFile { .. }
                | Self::ExtractionFailed { .. }
                | Self::RequiredPackFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidBundle { .. } => "fetch.invalid_bundle",
            Self::CouldNotDownloadFile { .. } => "fetch.could_not_download_file",
            Self::PackNotFound { .. } => "fetch.pack_not_found",
            Self::ExtractionFailed { .. } => "fetch.extraction_failed",
            Self::RequiredPackFailed { .. } => "fetch.required_pack_failed",
            Self::MixPackUnavailable { .. } => "fetch.mix_pack_unavailable",
        };
        Some(code)
    }
}
