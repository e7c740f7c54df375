//! Bounded in-process job queue.
//!
//! A tokio mpsc channel whose receiving half is shared by every worker in the
//! pool. Depth is tracked alongside the channel and mirrored to the
//! `pipeline_queue_depth` gauge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::metrics::MetricsCollector;

use super::job::PipelineJob;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is full (capacity {0})")]
    Full(usize),

    #[error("Queue is closed")]
    Closed,
}

/// Job queue shared between the ETL adapter and the worker pool.
pub struct JobQueue {
    sender: mpsc::Sender<PipelineJob>,
    receiver: Mutex<mpsc::Receiver<PipelineJob>>,
    depth: AtomicUsize,
    capacity: usize,
    metrics: MetricsCollector,
}

impl JobQueue {
    /// Creates a queue holding at most `capacity` waiting jobs.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            depth: AtomicUsize::new(0),
            capacity,
            metrics: MetricsCollector::new(),
        }
    }

    /// Enqueues a job without waiting.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Full` when the queue is at capacity and
    /// `QueueError::Closed` after [`JobQueue::close`].
    pub fn enqueue(&self, job: PipelineJob) -> Result<(), QueueError> {
        // Counted before sending so a fast dequeue never sees depth 0
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;

        if let Err(e) = self.sender.try_send(job) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full(self.capacity),
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            });
        }

        self.metrics.update_queue_depth(depth);
        Ok(())
    }

    /// Puts a job back for another attempt.
    pub fn requeue(&self, job: PipelineJob) -> Result<(), QueueError> {
        self.enqueue(job)
    }

    /// Waits up to `timeout` for the next job.
    ///
    /// Returns `Ok(None)` when nothing arrived in time and
    /// `Err(QueueError::Closed)` once the queue is closed and drained.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<PipelineJob>, QueueError> {
        let mut receiver = self.receiver.lock().await;

        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(job)) => {
                let depth = self
                    .depth
                    .fetch_sub(1, Ordering::SeqCst)
                    .saturating_sub(1);
                self.metrics.update_queue_depth(depth);
                Ok(Some(job))
            }
            Ok(None) => Err(QueueError::Closed),
            Err(_) => Ok(None),
        }
    }

    /// Stops accepting new jobs. Jobs already queued can still be dequeued.
    pub async fn close(&self) {
        self.receiver.lock().await.close();
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
