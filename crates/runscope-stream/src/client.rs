//! SSE stream client: single-flight connections with bounded recovery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StreamError;
use crate::frame::FrameParser;
use crate::log::EventLog;
use crate::recovery::{RecoveryPolicy, SessionBudgets};

/// Lifecycle of the stream connection, published over a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    /// User-initiated cancellation. Never enters the retry path.
    Cancelled,
    /// Reconnect budget exhausted; waiting on a manual retry.
    Failed,
}

/// Connection parameters for the stream client.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Backend base URL, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    pub policy: RecoveryPolicy,
    /// Pause before an allowed reconnect attempt.
    pub reconnect_backoff: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            policy: RecoveryPolicy::default(),
            reconnect_backoff: Duration::from_secs(2),
        }
    }
}

/// Client managing one SSE connection per run-detail view.
///
/// `connect` is single-flight: it cancels any prior in-flight
/// connection synchronously before spawning the new one. Cancellation
/// is idempotent and a silent no-op after natural stream completion.
pub struct StreamClient {
    config: StreamConfig,
    http: reqwest::Client,
    log: Arc<RwLock<EventLog>>,
    budgets: Arc<Mutex<SessionBudgets>>,
    status_tx: watch::Sender<StreamStatus>,
    revision_tx: watch::Sender<u64>,
    cancel_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    epoch: Arc<AtomicU64>,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_session_budgets(config, Arc::new(Mutex::new(SessionBudgets::new())))
    }

    /// Build a client over an existing session-scoped budget store.
    /// Dropping and re-creating a client for the same session keeps the
    /// recorded reconnect attempts, so re-creation cannot sidestep an
    /// exhausted budget.
    pub fn with_session_budgets(
        config: StreamConfig,
        budgets: Arc<Mutex<SessionBudgets>>,
    ) -> Self {
        let (status_tx, _) = watch::channel(StreamStatus::Idle);
        let (revision_tx, _) = watch::channel(0);
        Self {
            config,
            http: reqwest::Client::new(),
            log: Arc::new(RwLock::new(EventLog::new())),
            budgets,
            status_tx,
            revision_tx,
            cancel_tx: None,
            task: None,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle to the event log the stream feeds.
    pub fn log(&self) -> Arc<RwLock<EventLog>> {
        Arc::clone(&self.log)
    }

    /// Subscribe to connection status changes.
    pub fn status(&self) -> watch::Receiver<StreamStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to event-log revision bumps.
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// Open the SSE connection for `run_id`, cancelling any prior
    /// in-flight connection first.
    pub fn connect(&mut self, run_id: &str) {
        // Bump the epoch before cancelling so the replaced worker's
        // final status sends are suppressed, not raced against the new
        // worker's Connecting.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel_tx = Some(cancel_tx);

        let worker = ConnectionWorker {
            connection_id: Uuid::new_v4(),
            epoch,
            current_epoch: Arc::clone(&self.epoch),
            run_id: run_id.to_string(),
            config: self.config.clone(),
            http: self.http.clone(),
            log: Arc::clone(&self.log),
            budgets: Arc::clone(&self.budgets),
            status_tx: self.status_tx.clone(),
            revision_tx: self.revision_tx.clone(),
        };
        self.task = Some(tokio::spawn(worker.run(cancel_rx)));
    }

    /// Cancel the in-flight connection, if any. Safe to call multiple
    /// times; a no-op when nothing is in flight or the stream already
    /// completed naturally.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            // The worker may already be gone; that is fine.
            let _ = tx.send(true);
        }
        self.task = None;
    }

    /// Manual retry affordance for the Failed state: clears the
    /// reconnect budget and connects again.
    pub fn retry(&mut self, run_id: &str) {
        if let Ok(mut budgets) = self.budgets.lock() {
            budgets.reset(run_id);
        }
        self.connect(run_id);
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.cancel();
    }
}

enum StreamEnd {
    Cancelled,
    Closed,
}

struct ConnectionWorker {
    connection_id: Uuid,
    /// Epoch this worker was spawned under; stale workers must not
    /// publish status over their replacement.
    epoch: u64,
    current_epoch: Arc<AtomicU64>,
    run_id: String,
    config: StreamConfig,
    http: reqwest::Client,
    log: Arc<RwLock<EventLog>>,
    budgets: Arc<Mutex<SessionBudgets>>,
    status_tx: watch::Sender<StreamStatus>,
    revision_tx: watch::Sender<u64>,
}

impl ConnectionWorker {
    /// Publish a status change unless this worker has been replaced by
    /// a newer `connect`.
    fn publish(&self, status: StreamStatus) {
        if self.current_epoch.load(Ordering::SeqCst) == self.epoch {
            let _ = self.status_tx.send(status);
        }
    }

    async fn run(self, mut cancel_rx: watch::Receiver<bool>) {
        let mut first = true;
        loop {
            self.publish(if first {
                StreamStatus::Connecting
            } else {
                StreamStatus::Reconnecting
            });
            first = false;

            match self.stream_once(&mut cancel_rx).await {
                Ok(StreamEnd::Cancelled) => {
                    info!(connection_id = %self.connection_id, "stream cancelled");
                    self.publish(StreamStatus::Cancelled);
                    return;
                }
                Ok(StreamEnd::Closed) => {
                    debug!(connection_id = %self.connection_id, "stream closed by server");
                }
                Err(e) => {
                    warn!(connection_id = %self.connection_id, error = %e, "transient stream error");
                }
            }

            if *cancel_rx.borrow() {
                self.publish(StreamStatus::Cancelled);
                return;
            }

            let allowed = self
                .budgets
                .lock()
                .map(|mut b| b.try_acquire(&self.run_id, self.config.policy))
                .unwrap_or(false);
            if !allowed {
                warn!(run_id = %self.run_id, "reconnect budget exhausted");
                self.publish(StreamStatus::Failed);
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        self.publish(StreamStatus::Cancelled);
                        return;
                    }
                }
            }
        }
    }

    async fn stream_once(
        &self,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> Result<StreamEnd, StreamError> {
        let url = format!(
            "{}/runs/{}/events",
            self.config.base_url.trim_end_matches('/'),
            self.run_id
        );
        let response = self
            .http
            .get(&url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StreamError::BadStatus(response.status().as_u16()));
        }

        info!(connection_id = %self.connection_id, run_id = %self.run_id, "stream connected");
        self.publish(StreamStatus::Connected);

        let mut parser = FrameParser::new();
        let mut stream = response.bytes_stream();
        loop {
            tokio::select! {
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        return Ok(StreamEnd::Cancelled);
                    }
                }
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => {
                            let frames = parser.push(&bytes);
                            if frames.is_empty() {
                                continue;
                            }
                            let mut log = self.log.write().await;
                            let mut changed = false;
                            for frame in &frames {
                                changed |= log.apply_frame(frame);
                            }
                            let revision = log.revision();
                            drop(log);
                            if changed {
                                let _ = self.revision_tx.send(revision);
                            }
                        }
                        Some(Err(e)) => return Err(StreamError::Http(e)),
                        None => return Ok(StreamEnd::Closed),
                    }
                }
            }
        }
    }
}
