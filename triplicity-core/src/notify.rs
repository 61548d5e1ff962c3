use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{error, info, warn};
use triplicity_shared::Masked;

use crate::BoxError;

/// A plain-text message addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Masked<String>,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: Masked::new(to.into()),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        self.to.expose()
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), BoxError>;
}

/// Writes messages to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &Email) -> Result<(), BoxError> {
        info!(
            "Email to {}: {}\n{}",
            triplicity_shared::pii::redact_email(email.recipient()),
            email.subject,
            email.body
        );
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests across the workspace.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<Email>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.read().await.clone()
    }

    /// Polls until at least `count` messages were recorded or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.sent.read().await.len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: &Email) -> Result<(), BoxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("Simulated mail transport failure".into());
        }
        self.sent.write().await.push(email.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    pub send_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            workers: 4,
            send_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
struct DispatchCounters {
    accepted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub accepted: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Fire-and-forget email dispatch backed by a bounded queue and a fixed worker pool.
///
/// `dispatch` never waits: a full queue drops the message and logs it. Delivery
/// errors and timeouts are logged by the workers and never reach the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Email>,
    counters: Arc<DispatchCounters>,
}

impl NotificationDispatcher {
    /// Spawns the worker pool on the current tokio runtime.
    pub fn start(notifier: Arc<dyn Notifier>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let counters = Arc::new(DispatchCounters::default());

        for worker_id in 0..config.workers.max(1) {
            tokio::spawn(run_worker(
                worker_id,
                rx.clone(),
                notifier.clone(),
                config.send_timeout,
                counters.clone(),
            ));
        }

        Self { tx, counters }
    }

    /// Queues a message. Returns `false` when it was dropped.
    pub fn dispatch(&self, email: Email) -> bool {
        match self.tx.try_send(email) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(email)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Notification queue full, dropping '{}' for {}",
                    email.subject,
                    triplicity_shared::pii::redact_email(email.recipient())
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                error!("Notification workers stopped, dropping '{}'", email.subject);
                false
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Email>>>,
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
    counters: Arc<DispatchCounters>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(email) = next else {
            break;
        };

        match tokio::time::timeout(send_timeout, notifier.send(&email)).await {
            Ok(Ok(())) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                info!("Notification '{}' delivered by worker {}", email.subject, worker_id);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!("Error sending notification '{}': {}", email.subject, e);
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Notification '{}' timed out after {:?}",
                    email.subject, send_timeout
                );
            }
        }
    }
}
