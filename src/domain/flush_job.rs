//! Click write-back jobs and the queue that carries them to the worker.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::telemetry::names;

/// A request to write pending clicks for one short code back to the store.
///
/// Created on every successful resolution and processed off the request path
/// by [`crate::domain::flush_worker::run_flush_worker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushJob {
    pub code: String,
    /// True when the triggering click was recorded in the cache's pending
    /// delta. False means the cache was absent or the increment failed, and
    /// the job stands for exactly one click.
    pub pending_in_cache: bool,
}

impl FlushJob {
    /// A job whose click sits in the cache's pending delta.
    pub fn cached(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            pending_in_cache: true,
        }
    }

    /// A job that writes a single click straight to the store.
    pub fn direct(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            pending_in_cache: false,
        }
    }
}

/// How long a direct job may wait for a free slot in a full queue.
pub const DIRECT_JOB_GRACE: Duration = Duration::from_millis(50);

/// Sending half of the bounded flush queue.
///
/// A dropped cached job loses nothing, since its click stays in the cache
/// delta until the next flush for that code. A direct job carries its click
/// itself, so [`FlushQueue::enqueue`] lets it wait briefly for room.
#[derive(Debug, Clone)]
pub struct FlushQueue {
    tx: mpsc::Sender<FlushJob>,
}

impl FlushQueue {
    /// Creates a queue holding at most `capacity` pending jobs.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<FlushJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueues `job`, waiting up to [`DIRECT_JOB_GRACE`] for room when it
    /// is a direct job. Returns false if the job was dropped.
    pub async fn enqueue(&self, job: FlushJob) -> bool {
        if job.pending_in_cache {
            return self.schedule(job);
        }

        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                match self.tx.send_timeout(job, DIRECT_JOB_GRACE).await {
                    Ok(()) => true,
                    Err(mpsc::error::SendTimeoutError::Timeout(job)) => {
                        warn!(code = %job.code, "Flush queue full, dropping direct click");
                        metrics::counter!(names::FLUSH_JOBS_DROPPED_TOTAL, "reason" => "full")
                            .increment(1);
                        false
                    }
                    Err(mpsc::error::SendTimeoutError::Closed(job)) => {
                        warn!(code = %job.code, "Flush queue closed, dropping job");
                        metrics::counter!(names::FLUSH_JOBS_DROPPED_TOTAL, "reason" => "closed")
                            .increment(1);
                        false
                    }
                }
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(code = %job.code, "Flush queue closed, dropping job");
                metrics::counter!(names::FLUSH_JOBS_DROPPED_TOTAL, "reason" => "closed").increment(1);
                false
            }
        }
    }

    /// Enqueues `job` without waiting, returning false if it had to be dropped.
    pub fn schedule(&self, job: FlushJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(code = %job.code, cached = job.pending_in_cache, "Flush queue full, dropping job");
                metrics::counter!(names::FLUSH_JOBS_DROPPED_TOTAL, "reason" => "full").increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(code = %job.code, "Flush queue closed, dropping job");
                metrics::counter!(names::FLUSH_JOBS_DROPPED_TOTAL, "reason" => "closed").increment(1);
                false
            }
        }
    }

    /// Returns true once the worker has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Remaining free slots.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}
