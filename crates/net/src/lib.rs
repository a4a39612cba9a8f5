#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for osup
//!
//! This crate handles all HTTP operations: size probes, single downloads with
//! retry and backoff, and the bounded parallel download session used to fetch
//! packs.

mod client;
mod retry;
mod session;

pub use client::{is_not_found, NetClient, NetConfig};
pub use retry::{calculate_backoff_delay, RetryConfig};
pub use session::{
    DownloadHandler, DownloadRequest, DownloadSession, SessionProgress, TransferFailure,
};

use osup_errors::{Error, NetworkError};
use url::Url;

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://example.com").is_ok());
        assert!(parse_url("not a url").is_err());
    }
}
