//! Bounded write queue drained by a fixed worker pool.
//!
//! Ingress hands jobs over with [`WriteQueue::enqueue`] and returns at once;
//! workers run them after the response has been sent. When the queue is full
//! the overflow policy decides between dropping the job and waiting briefly
//! for room.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use pipeline_core::{Error, Result, TelemetryEvent, TenantId, ValidatedEvent};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::{health, metrics};
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What to do with a job that arrives at a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Discard the job, log it and count it.
    #[default]
    Drop,
    /// Wait up to `wait_timeout_ms` for room, then discard.
    Wait,
}

/// Write queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

fn default_capacity() -> usize {
    10_000
}

fn default_workers() -> usize {
    8
}

fn default_wait_timeout_ms() -> u64 {
    50
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            workers: default_workers(),
            overflow: OverflowPolicy::default(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

/// Deferred persistence work.
#[derive(Debug, Clone)]
pub enum WriteJob {
    /// One event that already passed validation and dedup.
    Single {
        event: ValidatedEvent,
        tenant: TenantId,
    },
    /// Raw batch events; each is validated when the job runs.
    Batch {
        events: Vec<TelemetryEvent>,
        tenant: TenantId,
    },
}

impl WriteJob {
    fn kind(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Batch { .. } => "batch",
        }
    }
}

/// Executes dequeued jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: WriteJob);
}

/// Result of handing a job to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Accepted,
    /// Queue was full; the job was discarded.
    Dropped,
}

/// Bounded job queue with a worker pool.
pub struct WriteQueue {
    sender: Mutex<Option<mpsc::Sender<WriteJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    config: QueueConfig,
}

/// Marks a job finished and wakes idle waiters when none remain.
fn finish(pending: &AtomicUsize, idle: &Notify) {
    let remaining = pending.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics().queue_depth.set(remaining as u64);
    if remaining == 0 {
        idle.notify_waiters();
    }
}

impl WriteQueue {
    /// Creates the queue and spawns its workers on the current runtime.
    pub fn start(config: QueueConfig, handler: Arc<dyn JobHandler>) -> Arc<Self> {
        let capacity = config.capacity.max(1);
        let worker_count = config.workers.max(1);
        let (sender, receiver) = mpsc::channel::<WriteJob>(capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                let pending = pending.clone();
                let idle = idle.clone();
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else {
                            debug!(worker_id, "Write queue closed, worker exiting");
                            break;
                        };

                        let kind = job.kind();
                        metrics().in_flight_jobs.inc();
                        if AssertUnwindSafe(handler.handle(job))
                            .catch_unwind()
                            .await
                            .is_err()
                        {
                            error!(worker_id, job = kind, "Write job panicked");
                        }
                        metrics().in_flight_jobs.dec();
                        finish(&pending, &idle);
                    }
                })
            })
            .collect();

        health().write_queue.set_healthy();
        info!(capacity, workers = worker_count, overflow = ?config.overflow, "Write queue started");

        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            pending,
            idle,
            config,
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Jobs accepted and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Hands a job to the workers without waiting for it to run.
    pub async fn enqueue(&self, job: WriteJob) -> Result<Enqueued> {
        let sender = self.sender.lock().clone().ok_or(Error::QueueClosed)?;
        let kind = job.kind();

        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        metrics().queue_depth.set(depth as u64);

        let sent = match self.config.overflow {
            OverflowPolicy::Drop => match sender.try_send(job) {
                Ok(()) => Ok(true),
                Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
                Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::QueueClosed),
            },
            OverflowPolicy::Wait => {
                let wait = Duration::from_millis(self.config.wait_timeout_ms);
                match tokio::time::timeout(wait, sender.send(job)).await {
                    Ok(Ok(())) => Ok(true),
                    Ok(Err(_)) => Err(Error::QueueClosed),
                    Err(_) => Ok(false),
                }
            }
        };

        match sent {
            Ok(true) => {
                metrics().jobs_enqueued.inc();
                Ok(Enqueued::Accepted)
            }
            Ok(false) => {
                finish(&self.pending, &self.idle);
                metrics().queue_rejections.inc();
                warn!(
                    job = kind,
                    capacity = self.config.capacity,
                    "Write queue full, dropping job"
                );
                Ok(Enqueued::Dropped)
            }
            Err(e) => {
                finish(&self.pending, &self.idle);
                Err(e)
            }
        }
    }

    /// Resolves once every accepted job has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stops accepting jobs, drains what is queued and joins the workers.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);
        health().write_queue.set_unhealthy("shut down");

        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Write queue worker failed");
            }
        }
        info!("Write queue drained");
    }
}
