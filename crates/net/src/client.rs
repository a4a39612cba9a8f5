//! reqwest client shared by probes and pack transfers

use crate::retry::{calculate_backoff_delay, RetryConfig};
use futures::StreamExt;
use osup_errors::{Error, NetworkError};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Timeouts, pooling and retry policy for [`NetClient`]
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large packs
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            retry: RetryConfig::default(),
            user_agent: format!("osup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NetConfig {
    /// Network settings taken from the loaded configuration
    #[must_use]
    pub fn from_config(config: &osup_config::Config) -> Self {
        Self {
            timeout: config.timeout(),
            retry: RetryConfig {
                max_retries: config.network.retries,
                initial_delay: config.retry_delay(),
                ..RetryConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Pooled HTTP client with the retry policy baked in
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// # Errors
    ///
    /// Returns an error if reqwest cannot build the client, e.g. when the
    /// TLS backend fails to load.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.config.retry
    }

    /// HEAD `url`, retrying transport failures with backoff
    ///
    /// # Errors
    ///
    /// Returns the last transport error once retries run out, or
    /// `RateLimited` when the server asks the client to back off.
    pub async fn head(&self, url: &str) -> Result<Response, Error> {
        self.retry_request(|| self.client.head(url).send()).await
    }

    /// Probe the size of a remote file with a HEAD request
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a 404, `HttpError` for other failing statuses and
    /// `MissingContentLength` when the server does not report a size.
    pub async fn content_length(&self, url: &str) -> Result<u64, Error> {
        let response = self.head(url).await?;
        check_status(url, &response)?;

        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                NetworkError::MissingContentLength {
                    url: url.to_string(),
                }
                .into()
            })
    }

    /// Stream `url` into `dest`, reporting the running byte count
    ///
    /// Makes a single attempt; callers decide whether to retry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a 404, `HttpError` for other failing statuses,
    /// and network or I/O errors raised while streaming.
    pub async fn download_to<F>(&self, url: &str, dest: &Path, mut on_progress: F) -> Result<u64, Error>
    where
        F: FnMut(u64) + Send,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| convert_reqwest_error(&e))?;
        check_status(url, &response)?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io_with_path(&e, dest))?;
            downloaded += chunk.len() as u64;
            on_progress(downloaded);
        }

        file.flush()
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        Ok(downloaded)
    }

    async fn retry_request<F, Fut>(&self, mut f: F) -> Result<Response, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.retry.max_retries {
            if attempt > 0 {
                tokio::time::sleep(calculate_backoff_delay(&self.config.retry, attempt)).await;
            }

            match f().await {
                Ok(response) => {
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        if let Some(retry_after) = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                        {
                            return Err(NetworkError::RateLimited {
                                seconds: retry_after,
                            }
                            .into());
                        }
                    }

                    return Ok(response);
                }
                Err(e) => {
                    let retry = Self::should_retry(&e);
                    last_error = Some(e);
                    if !retry {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(convert_reqwest_error(&e)),
            None => Err(NetworkError::DownloadFailed("no attempt was made".to_string()).into()),
        }
    }

    fn should_retry(error: &reqwest::Error) -> bool {
        error.is_timeout()
            || error.is_connect()
            || error.status().is_none_or(|s| s.is_server_error())
    }
}

fn check_status(url: &str, response: &Response) -> Result<(), Error> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(NetworkError::NotFound {
            url: url.to_string(),
        }
        .into());
    }
    if !status.is_success() {
        return Err(NetworkError::HttpError {
            status: status.as_u16(),
            message: status.to_string(),
        }
        .into());
    }
    Ok(())
}

fn convert_reqwest_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        NetworkError::Timeout {
            url: e.url().map(ToString::to_string).unwrap_or_default(),
        }
        .into()
    } else if e.is_connect() {
        NetworkError::ConnectionRefused(e.to_string()).into()
    } else {
        NetworkError::DownloadFailed(e.to_string()).into()
    }
}

/// Whether an error means the server does not have the file
#[must_use]
pub fn is_not_found(error: &Error) -> bool {
    matches!(error, Error::Network(NetworkError::NotFound { .. }))
}
