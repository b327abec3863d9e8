//! Admission queue and fixed worker pool.
//!
//! `N` worker loops share one bounded FIFO. Submitters wait when it is full
//! (or get `QueueFull` from `try_submit`). Every running job gets a child of
//! the dispatcher's root token; `shutdown` cancels the root, so in-flight
//! jobs stop and queued ones are left `pending` for the next run.

mod registry;


pub use registry::{ActiveGuard, ActiveJobs};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::FetchConfig;
use crate::sink::{NullSink, ProgressSink};
use crate::store::{Job, JobId};
use crate::worker::{JobCancel, Worker};

/// Submission errors. Validation happens before a job is queued.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid job: {0}")]
    InvalidJob(String),
    #[error("job queue is full")]
    QueueFull,
    #[error("dispatcher is shut down")]
    ShutDown,
}

/// Pool sizing and shutdown behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    /// How long `shutdown` waits before warning that workers are still busy.
    pub shutdown_grace: Duration,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl DispatcherOptions {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            workers: cfg.workers.max(1),
            queue_capacity: cfg.queue_capacity.max(1),
            shutdown_grace: cfg.shutdown_grace(),
        }
    }
}

/// State shared with the worker loops.
struct Shared {
    worker: Worker,
    active: Arc<ActiveJobs>,
    sink: RwLock<Arc<dyn ProgressSink>>,
    root: CancellationToken,
}

impl Shared {
    async fn run_one(&self, index: usize, job: Job) {
        if self.root.is_cancelled() {
            debug!(worker = index, job_id = job.id, "shutting down; job left pending");
            return;
        }
        let cancel = JobCancel::child_of(&self.root);
        let Some(active) = self.active.register(job.id, cancel.token().clone()) else {
            warn!(worker = index, job_id = job.id, "job already running; duplicate queue entry skipped");
            return;
        };
        let cancel = cancel.registered(Arc::clone(&self.active), &active);
        // Sink current at job start; later replacements apply to later jobs.
        let sink = Arc::clone(&*self.sink.read());
        let outcome = self.worker.run(&job, &cancel, sink.as_ref()).await;
        drop(active);
        debug!(worker = index, job_id = job.id, ?outcome, "job finished");
    }
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>;

async fn worker_loop(index: usize, shared: Arc<Shared>, rx: SharedReceiver) {
    debug!(worker = index, "worker loop started");
    loop {
        let next = tokio::select! {
            biased;
            _ = shared.root.cancelled() => None,
            job = async { rx.lock().await.recv().await } => job,
        };
        let Some(job) = next else {
            break;
        };
        shared.run_one(index, job).await;
    }
    debug!(worker = index, "worker loop exiting");
}

/// Bounded queue in front of a fixed pool of workers.
pub struct Dispatcher {
    shared: Arc<Shared>,
    opts: DispatcherOptions,
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    rx: Mutex<Option<mpsc::Receiver<Job>>>,
    workers: Mutex<Option<JoinSet<()>>>,
    shut_down: AtomicBool,
}

impl Dispatcher {
    /// Build a dispatcher around `worker`. Nothing runs until `start`.
    pub fn new(worker: Worker, opts: DispatcherOptions) -> Self {
        let (tx, rx) = mpsc::channel(opts.queue_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                worker,
                active: Arc::new(ActiveJobs::new()),
                sink: RwLock::new(Arc::new(NullSink)),
                root: CancellationToken::new(),
            }),
            opts,
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            workers: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.opts
    }

    /// Launch the worker loops. Must be called inside a tokio runtime; a
    /// second call does nothing.
    pub fn start(&self) {
        let Some(rx) = self.rx.lock().take() else {
            debug!("dispatcher already started");
            return;
        };
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let mut set = JoinSet::new();
        for index in 0..self.opts.workers.max(1) {
            set.spawn(worker_loop(index, Arc::clone(&self.shared), Arc::clone(&rx)));
        }
        *self.workers.lock() = Some(set);
        info!(
            workers = self.opts.workers,
            queue_capacity = self.opts.queue_capacity,
            "dispatcher started"
        );
    }

    fn sender(&self, job: &Job) -> Result<mpsc::Sender<Job>, DispatchError> {
        job.validate().map_err(DispatchError::InvalidJob)?;
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(DispatchError::ShutDown);
        }
        self.tx.lock().clone().ok_or(DispatchError::ShutDown)
    }

    /// Queue a job, waiting while the queue is full.
    pub async fn submit(&self, job: Job) -> Result<(), DispatchError> {
        let tx = self.sender(&job)?;
        let id = job.id;
        tx.send(job).await.map_err(|_| DispatchError::ShutDown)?;
        debug!(job_id = id, "job queued");
        Ok(())
    }

    /// Queue a job without waiting; `QueueFull` is the backpressure signal.
    pub fn try_submit(&self, job: Job) -> Result<(), DispatchError> {
        let tx = self.sender(&job)?;
        let id = job.id;
        tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::ShutDown,
        })?;
        debug!(job_id = id, "job queued");
        Ok(())
    }

    /// Cancel a running job. True only for the call that actually fired the
    /// job's token; unknown, finished or already-cancelled jobs give false.
    ///
    /// A job that has passed its last check and is publishing is no longer
    /// cancellable and gives false too, so a true return always ends with
    /// the job `failed`.
    pub fn cancel(&self, id: JobId) -> bool {
        let fired = self.shared.active.cancel(id);
        if fired {
            info!(job_id = id, "cancellation requested");
        }
        fired
    }

    pub fn is_active(&self, id: JobId) -> bool {
        self.shared.active.is_active(id)
    }

    pub fn active_count(&self) -> usize {
        self.shared.active.len()
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        self.shared.active.ids()
    }

    /// Replace the progress sink. Jobs already running keep the old one.
    pub fn set_progress_sink(&self, sink: Arc<dyn ProgressSink>) {
        *self.shared.sink.write() = sink;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs, cancel everything in flight and wait for the
    /// worker loops to exit. Only the first call has any effect.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("shutdown already requested");
            return;
        }
        info!(active = self.active_count(), "dispatcher shutting down");
        self.shared.root.cancel();
        self.tx.lock().take();
        // Never started: closing the receiver wakes submitters blocked on a
        // full queue with `ShutDown`. Queued jobs stay pending in the store.
        self.rx.lock().take();

        let workers = self.workers.lock().take();
        let Some(mut workers) = workers else {
            return;
        };
        let grace = self.opts.shutdown_grace;
        let drain = async move {
            while let Some(res) = workers.join_next().await {
                if let Err(e) = res {
                    error!("worker loop ended abnormally: {}", e);
                }
            }
        };
        tokio::pin!(drain);
        if tokio::time::timeout(grace, &mut drain).await.is_err() {
            warn!(
                grace_secs = grace.as_secs(),
                active = self.active_count(),
                "workers still busy after grace period; still waiting"
            );
            drain.await;
        }
        info!("dispatcher stopped");
    }
}
