//! CLI error handling

use std::fmt;
use std::path::PathBuf;

use osup_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Pipeline error from one of the library crates
    Ops(osup_errors::Error),
    /// An input file could not be read or parsed
    Input { path: PathBuf, message: String },
    /// Files were left un-updated
    Deficit { deficit: usize, expected: usize },
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Input { path, message } => {
                write!(f, "Invalid input {}: {message}", path.display())
            }
            CliError::Deficit { deficit, expected } => {
                write!(f, "{deficit} of {expected} files were not updated")
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<osup_errors::Error> for CliError {
    fn from(e: osup_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<osup_errors::ConfigError> for CliError {
    fn from(e: osup_errors::ConfigError) -> Self {
        CliError::Ops(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
