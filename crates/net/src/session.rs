//! Bounded parallel download session
//!
//! Transfers run as tokio tasks gated by a semaphore. Their results come back
//! through the session's `JoinSet` and their byte counts through an mpsc
//! channel, and both are only ever consumed by the session owner inside
//! [`DownloadSession::enqueue`] and [`DownloadSession::end`]. The handler is
//! borrowed mutably for the session's lifetime, so its callbacks can never
//! run concurrently with each other.

use crate::client::{is_not_found, NetClient};
use crate::retry::calculate_backoff_delay;
use async_trait::async_trait;
use osup_errors::{Error, NetworkError, UserFacingError};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{Id, JoinError, JoinSet};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// One queued or in-flight transfer
#[derive(Debug)]
pub struct DownloadRequest<T> {
    pub url: String,
    pub dest: PathBuf,
    pub data: T,
}

/// Why a transfer did not complete
#[derive(Debug, Clone)]
pub enum TransferFailure {
    /// The server answered 404
    NotFound { url: String },
    /// Network or I/O failure after all retries
    Transfer(Error),
    /// The transfer finished but the success handler rejected it
    Handler(Error),
}

impl TransferFailure {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The failure as an error value
    #[must_use]
    pub fn to_error(&self) -> Error {
        match self {
            Self::NotFound { url } => NetworkError::NotFound { url: url.clone() }.into(),
            Self::Transfer(e) | Self::Handler(e) => e.clone(),
        }
    }
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { url } => write!(f, "not found: {url}"),
            Self::Transfer(e) | Self::Handler(e) => write!(f, "{e}"),
        }
    }
}

/// Aggregate progress over every transfer in the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub downloaded_bytes: u64,
    pub completed: usize,
    pub enqueued: usize,
}

/// Completion callbacks for a download session
#[async_trait]
pub trait DownloadHandler<T: Send + Sync>: Send {
    /// The transfer landed at `request.dest`. Returning an error routes the
    /// request to [`DownloadHandler::on_error`].
    async fn on_success(&mut self, request: &DownloadRequest<T>) -> Result<(), Error>;

    /// Decide whether the session may continue after a failure. Returning
    /// `false` cancels every remaining transfer.
    fn on_error(&mut self, request: &DownloadRequest<T>, failure: &TransferFailure) -> bool;

    /// Called exactly once per request, after its outcome was handled or when
    /// it was cancelled.
    fn on_cleanup(&mut self, _request: DownloadRequest<T>) {}
}

type ProgressCallback<'h> = Box<dyn FnMut(SessionProgress) + Send + 'h>;

struct ProgressMessage {
    id: u64,
    downloaded: u64,
}

/// A set of transfers sharing one concurrency limit
pub struct DownloadSession<'h, T, H>
where
    T: Send + Sync,
    H: DownloadHandler<T>,
{
    client: NetClient,
    handler: &'h mut H,
    permits: Arc<Semaphore>,
    queue_limit: usize,
    tasks: JoinSet<Result<u64, Error>>,
    task_ids: HashMap<Id, u64>,
    pending: HashMap<u64, DownloadRequest<T>>,
    progress_tx: mpsc::UnboundedSender<ProgressMessage>,
    progress_rx: mpsc::UnboundedReceiver<ProgressMessage>,
    progress: Option<ProgressCallback<'h>>,
    bytes: HashMap<u64, u64>,
    stats: SessionProgress,
    next_id: u64,
    failure: Option<Error>,
}

impl<'h, T, H> DownloadSession<'h, T, H>
where
    T: Send + Sync,
    H: DownloadHandler<T>,
{
    /// Start a session running at most `max_concurrency` transfers at once
    pub fn start(client: NetClient, max_concurrency: usize, handler: &'h mut H) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        Self {
            client,
            handler,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            queue_limit: max_concurrency * 2,
            tasks: JoinSet::new(),
            task_ids: HashMap::new(),
            pending: HashMap::new(),
            progress_tx,
            progress_rx,
            progress: None,
            bytes: HashMap::new(),
            stats: SessionProgress::default(),
            next_id: 0,
            failure: None,
        }
    }

    /// Install a callback receiving aggregate progress
    pub fn set_progress(&mut self, callback: impl FnMut(SessionProgress) + Send + 'h) {
        self.progress = Some(Box::new(callback));
    }

    /// Number of requests not yet completed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue a transfer of `url` into `dest`
    ///
    /// Completed transfers are handled before returning. When the queue is
    /// full this waits for a transfer to finish first.
    ///
    /// # Errors
    ///
    /// Returns the failure that made the handler stop the session.
    pub async fn enqueue(
        &mut self,
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
        data: T,
    ) -> Result<(), Error> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        self.drain_ready().await?;
        while self.pending.len() >= self.queue_limit {
            if !self.complete_next().await? {
                break;
            }
        }

        let request = DownloadRequest {
            url: url.into(),
            dest: dest.into(),
            data,
        };
        let id = self.next_id;
        self.next_id += 1;

        let handle = self.tasks.spawn(transfer(
            self.client.clone(),
            request.url.clone(),
            request.dest.clone(),
            id,
            Arc::clone(&self.permits),
            self.progress_tx.clone(),
        ));
        self.task_ids.insert(handle.id(), id);
        self.pending.insert(id, request);
        self.stats.enqueued += 1;
        Ok(())
    }

    /// Wait for every queued transfer and handle its outcome
    ///
    /// # Errors
    ///
    /// Returns the failure that made the handler stop the session.
    pub async fn end(mut self) -> Result<(), Error> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        while self.complete_next().await? {}
        Ok(())
    }

    /// Abort every outstanding transfer
    ///
    /// Partial destination files are removed and `on_cleanup` runs for each
    /// abandoned request.
    pub async fn cancel(mut self) {
        self.abort_remaining().await;
    }

    async fn drain_ready(&mut self) -> Result<(), Error> {
        self.drain_progress();
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.finish(joined).await?;
        }
        Ok(())
    }

    async fn complete_next(&mut self) -> Result<bool, Error> {
        loop {
            tokio::select! {
                biased;
                Some(msg) = self.progress_rx.recv() => self.record_progress(&msg),
                joined = self.tasks.join_next_with_id() => {
                    let Some(joined) = joined else {
                        return Ok(false);
                    };
                    self.drain_progress();
                    self.finish(joined).await?;
                    return Ok(true);
                }
            }
        }
    }

    async fn finish(
        &mut self,
        joined: Result<(Id, Result<u64, Error>), JoinError>,
    ) -> Result<(), Error> {
        let (task_id, outcome) = match joined {
            Ok((task_id, outcome)) => (task_id, outcome),
            Err(e) => (
                e.id(),
                Err(Error::internal(format!("transfer task failed: {e}"))),
            ),
        };
        let Some(id) = self.task_ids.remove(&task_id) else {
            return Ok(());
        };
        let Some(request) = self.pending.remove(&id) else {
            return Ok(());
        };

        let failure = match outcome {
            Ok(size) => {
                self.bytes.insert(id, size);
                match self.handler.on_success(&request).await {
                    Ok(()) => None,
                    Err(e) => Some(TransferFailure::Handler(e)),
                }
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&request.dest).await;
                if is_not_found(&e) {
                    Some(TransferFailure::NotFound {
                        url: request.url.clone(),
                    })
                } else {
                    Some(TransferFailure::Transfer(e))
                }
            }
        };

        self.stats.completed += 1;
        let refused = failure.filter(|f| !self.handler.on_error(&request, f));
        self.handler.on_cleanup(request);
        self.report_progress();

        if let Some(failure) = refused {
            let err = failure.to_error();
            self.abort_remaining().await;
            self.failure = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }

    async fn abort_remaining(&mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        self.task_ids.clear();

        let abandoned: Vec<_> = self.pending.drain().map(|(_, request)| request).collect();
        for request in abandoned {
            let _ = tokio::fs::remove_file(&request.dest).await;
            self.handler.on_cleanup(request);
        }
    }

    fn drain_progress(&mut self) {
        while let Ok(msg) = self.progress_rx.try_recv() {
            self.record_progress(&msg);
        }
    }

    fn record_progress(&mut self, msg: &ProgressMessage) {
        self.bytes.insert(msg.id, msg.downloaded);
        self.report_progress();
    }

    fn report_progress(&mut self) {
        if let Some(callback) = self.progress.as_mut() {
            let snapshot = SessionProgress {
                downloaded_bytes: self.bytes.values().sum(),
                ..self.stats
            };
            callback(snapshot);
        }
    }
}

async fn transfer(
    client: NetClient,
    url: String,
    dest: PathBuf,
    id: u64,
    permits: Arc<Semaphore>,
    progress: mpsc::UnboundedSender<ProgressMessage>,
) -> Result<u64, Error> {
    let _permit = permits.acquire_owned().await.map_err(|_| Error::Cancelled)?;
    let retry = client.retry_config().clone();
    let mut attempt = 0;

    loop {
        let mut last_report: Option<Instant> = None;
        let result = client
            .download_to(&url, &dest, |downloaded| {
                if last_report.is_none_or(|at| at.elapsed() >= PROGRESS_INTERVAL) {
                    let _ = progress.send(ProgressMessage { id, downloaded });
                    last_report = Some(Instant::now());
                }
            })
            .await;

        match result {
            Ok(total) => {
                let _ = progress.send(ProgressMessage {
                    id,
                    downloaded: total,
                });
                return Ok(total);
            }
            Err(e) if attempt < retry.max_retries && !is_not_found(&e) && e.is_retryable() => {
                attempt += 1;
                tokio::time::sleep(calculate_backoff_delay(&retry, attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
