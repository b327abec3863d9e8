//! Progress sinks: where workers report `(job_id, percent, status)`.
//!
//! `notify` is called from worker tasks and must return quickly; a sink that
//! needs to do real work should hand the event off (see `ChannelSink`).

use serde::Serialize;
use tokio::sync::mpsc;

use crate::store::{JobId, JobStatus};

/// Receiver of progress and status transitions.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, job_id: JobId, percent: u8, status: JobStatus);
}

impl<F> ProgressSink for F
where
    F: Fn(JobId, u8, JobStatus) + Send + Sync,
{
    fn notify(&self, job_id: JobId, percent: u8, status: JobStatus) {
        self(job_id, percent, status)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&self, _job_id: JobId, _percent: u8, _status: JobStatus) {}
}

/// One reported transition; serializable for `--json` consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub percent: u8,
    pub status: JobStatus,
}

/// Forwards events into a bounded channel. Events are dropped (with a trace
/// log) when the channel is full or closed, so a slow consumer never stalls
/// a download.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, job_id: JobId, percent: u8, status: JobStatus) {
        let event = ProgressEvent {
            job_id,
            percent,
            status,
        };
        if let Err(e) = self.tx.try_send(event) {
            tracing::trace!(job_id, "progress event dropped: {}", e);
        }
    }
}
