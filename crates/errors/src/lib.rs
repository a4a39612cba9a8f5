#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the osup updater
//!
//! Each pipeline stage has its own enum; [`Error`] wraps them so a single
//! `Result` flows across crate boundaries. Every enum also implements
//! [`UserFacingError`], which is what events and the CLI render.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

pub mod config;
pub mod fetch;
pub mod install;
pub mod network;
pub mod storage;

pub use config::ConfigError;
pub use fetch::FetchError;
pub use install::InstallError;
pub use network::NetworkError;
pub use storage::StorageError;

/// Error crossing crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A blocking or spawned task died, or input could not be decoded
    #[error("internal error: {0}")]
    Internal(String),

    /// The transfer session shut down before a queued job could start
    #[error("operation cancelled")]
    Cancelled,

    /// Raw filesystem failure; `kind` is what callers branch on
    #[error("I/O error: {message}")]
    Io {
        kind: ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },
}

impl Error {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// The `io::ErrorKind` carried by this error, if it wraps one
    #[must_use]
    pub fn io_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Io { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The path an I/O failure happened on
    #[must_use]
    pub fn io_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } => path.as_deref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(ConfigError::ParseError {
            message: err.to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// How an error presents itself to a person or a log consumer
pub trait UserFacingError {
    /// One-line message for terminal output
    fn user_message(&self) -> Cow<'_, str>;

    /// What the operator can do about it
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether running the same command again may succeed
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable dotted code, e.g. `fetch.invalid_bundle`
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Network(err) => err.user_message(),
            Error::Storage(err) => err.user_message(),
            Error::Fetch(err) => err.user_message(),
            Error::Install(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Io {
                message,
                path: Some(path),
                ..
            } => Cow::Owned(format!("{}: {message}", path.display())),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Network(err) => err.user_hint(),
            Error::Storage(err) => err.user_hint(),
            Error::Fetch(err) => err.user_hint(),
            Error::Install(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Io {
                kind: ErrorKind::PermissionDenied,
                ..
            } => Some("Run the updater as root."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_retryable(),
            Error::Storage(err) => err.is_retryable(),
            Error::Fetch(err) => err.is_retryable(),
            Error::Install(err) => err.is_retryable(),
            Error::Io { kind, .. } => !matches!(
                kind,
                ErrorKind::PermissionDenied | ErrorKind::NotFound | ErrorKind::InvalidInput
            ),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Network(err) => err.user_code(),
            Error::Storage(err) => err.user_code(),
            Error::Fetch(err) => err.user_code(),
            Error::Install(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
