//! Concurrent long-polling receive pool.
//!
//! A single long-poll that comes back empty holds one HTTP connection for the
//! whole wait window. The pool runs several receive loops in parallel so that
//! throughput stays acceptable despite that per-connection latency.
//!
//! # Worker loop
//!
//! Each worker repeatedly:
//!
//! 1. issues one receive (single or batch) through the queue
//! 2. publishes the message(s) to the success channel, or the error to the
//!    error channel, waiting when the consumer is slow
//! 3. checks its own stop signal without blocking
//!
//! Nothing is dropped: a full output channel blocks the worker. A closed
//! output channel means nobody is listening any more and the worker exits.
//!
//! # Stopping
//!
//! Cancellation is cooperative. [`ReceiveWorkerPool::stop`] signals every
//! worker and then waits at most `stop_timeout` for each one. A worker still
//! blocked in a long-poll or on a full channel after that is abandoned: it
//! keeps running detached, sees its signal after the current iteration and
//! exits on its own.

use crate::error::{MqsError, ValidationError};
use crate::message::MessageReceiveResponse;
use crate::queue::{MqsQueue, ReceiveOptions};
use crate::validation::{check_batch_receive_size, check_wait_seconds};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;

/// Default number of receive workers
pub const DEFAULT_WORKERS: usize = 3;

/// Default wait for each worker to observe a stop
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a [`ReceiveWorkerPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of concurrent receive loops
    pub workers: usize,
    /// Long-poll wait per receive; `None` uses the queue's default
    pub wait_seconds: Option<u32>,
    /// Receive up to this many messages per request instead of one
    pub batch_size: Option<u32>,
    /// How long `stop` waits for each worker
    pub stop_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            wait_seconds: None,
            batch_size: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_wait_seconds(mut self, wait_seconds: u32) -> Self {
        self.wait_seconds = Some(wait_seconds);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Check worker count, wait seconds and batch size
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.workers == 0 {
            return Err(ValidationError::OutOfRange {
                field: "workers".to_string(),
                value: 0,
                min: 1,
                max: i64::MAX,
            });
        }

        if let Some(wait_seconds) = self.wait_seconds {
            check_wait_seconds(wait_seconds)?;
        }

        if let Some(batch_size) = self.batch_size {
            check_batch_receive_size(batch_size)?;
        }

        Ok(())
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Channels the workers publish into.
///
/// Shared by every worker of a pool; the consumer holds the receiving ends.
#[derive(Debug, Clone)]
pub struct ReceiveOutputs {
    pub messages: mpsc::Sender<MessageReceiveResponse>,
    pub errors: mpsc::Sender<MqsError>,
}

impl ReceiveOutputs {
    pub fn new(
        messages: mpsc::Sender<MessageReceiveResponse>,
        errors: mpsc::Sender<MqsError>,
    ) -> Self {
        Self { messages, errors }
    }

    /// Create both channels with the same capacity and return the receivers
    pub fn bounded(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Receiver<MessageReceiveResponse>,
        mpsc::Receiver<MqsError>,
    ) {
        let (messages, message_rx) = mpsc::channel(capacity);
        let (errors, error_rx) = mpsc::channel(capacity);
        (Self::new(messages, errors), message_rx, error_rx)
    }
}

/// Outcome of [`ReceiveWorkerPool::stop`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Workers that terminated within the stop timeout
    pub stopped: usize,
    /// Workers still running when their stop timeout elapsed
    pub abandoned: usize,
}

// ============================================================================
// Pool
// ============================================================================

struct WorkerSlot {
    id: usize,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Fixed-size pool of receive loops over one queue
pub struct ReceiveWorkerPool {
    queue: MqsQueue,
    config: WorkerPoolConfig,
    slots: Mutex<Vec<WorkerSlot>>,
}

impl ReceiveWorkerPool {
    /// Create a stopped pool.
    ///
    /// # Errors
    ///
    /// Returns `MqsError::Validation` if the configuration is out of range.
    pub fn new(queue: MqsQueue, config: WorkerPoolConfig) -> Result<Self, MqsError> {
        config.validate()?;

        Ok(Self {
            queue,
            config,
            slots: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Check whether any started worker is still running
    pub fn is_running(&self) -> bool {
        self.lock_slots()
            .iter()
            .any(|slot| !slot.handle.is_finished())
    }

    /// Spawn every worker and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `MqsError::PoolAlreadyRunning` if workers from an earlier start
    /// are still running.
    pub fn start(&self, outputs: ReceiveOutputs) -> Result<(), MqsError> {
        self.spawn_workers(outputs).map(|_| ())
    }

    /// Spawn every worker and wait until all of them have terminated
    pub async fn receive(&self, outputs: ReceiveOutputs) -> Result<(), MqsError> {
        let mut alive = self.spawn_workers(outputs)?;

        // Every worker holds a sender; recv yields None once all have exited
        let _ = alive.recv().await;

        debug!(queue = %self.queue.name(), "All receive workers terminated");
        Ok(())
    }

    /// Signal every worker and wait for each, up to `stop_timeout` apiece.
    ///
    /// Never blocks longer than `workers * stop_timeout`. Afterwards the pool
    /// holds no workers and can be started again.
    pub async fn stop(&self) -> StopReport {
        let slots = std::mem::take(&mut *self.lock_slots());
        if slots.is_empty() {
            return StopReport::default();
        }

        info!(
            queue = %self.queue.name(),
            workers = slots.len(),
            "Stopping receive worker pool"
        );

        // Signal every worker before waiting on any of them
        let mut pending = Vec::with_capacity(slots.len());
        for slot in slots {
            // Fails only if the worker already exited
            let _ = slot.stop.send(());
            pending.push((slot.id, slot.handle));
        }

        let mut report = StopReport::default();
        for (id, handle) in pending {
            match tokio::time::timeout(self.config.stop_timeout, handle).await {
                Ok(Ok(())) => report.stopped += 1,
                Ok(Err(e)) => {
                    warn!(queue = %self.queue.name(), worker = id, error = %e, "Receive worker failed");
                    report.stopped += 1;
                }
                Err(_) => {
                    warn!(
                        queue = %self.queue.name(),
                        worker = id,
                        timeout_ms = self.config.stop_timeout.as_millis() as u64,
                        "Receive worker did not stop in time, abandoning it"
                    );
                    report.abandoned += 1;
                }
            }
        }

        info!(
            queue = %self.queue.name(),
            stopped = report.stopped,
            abandoned = report.abandoned,
            "Receive worker pool stopped"
        );

        report
    }

    fn spawn_workers(&self, outputs: ReceiveOutputs) -> Result<mpsc::Receiver<()>, MqsError> {
        let mut slots = self.lock_slots();
        if slots.iter().any(|slot| !slot.handle.is_finished()) {
            return Err(MqsError::PoolAlreadyRunning {
                queue: self.queue.name().to_string(),
            });
        }
        slots.clear();

        let (alive_tx, alive_rx) = mpsc::channel::<()>(1);
        let options = ReceiveOptions {
            wait_seconds: self.config.wait_seconds,
        };

        for id in 0..self.config.workers {
            let (stop_tx, stop_rx) = oneshot::channel();
            let worker = Worker {
                id,
                queue: self.queue.clone(),
                options,
                batch_size: self.config.batch_size,
                outputs: outputs.clone(),
                stop: stop_rx,
                _alive: alive_tx.clone(),
            };

            slots.push(WorkerSlot {
                id,
                stop: stop_tx,
                handle: tokio::spawn(worker.run()),
            });
        }

        info!(
            queue = %self.queue.name(),
            workers = self.config.workers,
            wait_seconds = ?self.config.wait_seconds,
            batch_size = ?self.config.batch_size,
            "Receive worker pool started"
        );

        Ok(alive_rx)
    }

    fn lock_slots(&self) -> MutexGuard<'_, Vec<WorkerSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ReceiveWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveWorkerPool")
            .field("queue", &self.queue.name())
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

// ============================================================================
// Worker
// ============================================================================

struct Worker {
    id: usize,
    queue: MqsQueue,
    options: ReceiveOptions,
    batch_size: Option<u32>,
    outputs: ReceiveOutputs,
    stop: oneshot::Receiver<()>,
    _alive: mpsc::Sender<()>,
}

impl Worker {
    async fn run(mut self) {
        debug!(queue = %self.queue.name(), worker = self.id, "Receive worker started");

        loop {
            if !self.receive_once().await {
                debug!(
                    queue = %self.queue.name(),
                    worker = self.id,
                    "Output channel closed, receive worker exiting"
                );
                break;
            }

            match self.stop.try_recv() {
                Err(TryRecvError::Empty) => continue,
                Ok(()) | Err(TryRecvError::Closed) => break,
            }
        }

        debug!(queue = %self.queue.name(), worker = self.id, "Receive worker stopped");
    }

    /// Run one receive and publish the outcome; false once nobody listens
    async fn receive_once(&self) -> bool {
        match self.batch_size {
            None => match self.queue.receive_message(&self.options).await {
                Ok(message) => self.outputs.messages.send(message).await.is_ok(),
                Err(e) => self.outputs.errors.send(e).await.is_ok(),
            },
            Some(batch_size) => {
                match self
                    .queue
                    .batch_receive_message(Some(batch_size), &self.options)
                    .await
                {
                    Ok(batch) => {
                        for message in batch.messages {
                            if self.outputs.messages.send(message).await.is_err() {
                                return false;
                            }
                        }
                        true
                    }
                    Err(e) => self.outputs.errors.send(e).await.is_ok(),
                }
            }
        }
    }
}
