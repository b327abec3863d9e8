//! Runs one job: stream → (verify) → publish → record.
//!
//! The payload lands in a scratch `.part` file and reaches the public path
//! only through a rename after every check has passed. Whatever happens, the
//! job ends `complete` or `failed` and the scratch file is gone.

mod error;
mod progress;


pub use error::JobError;
pub use progress::{ProgressTracker, EMIT_INTERVAL};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checksum::{self, HashAlgorithm};
use crate::dispatcher::{ActiveGuard, ActiveJobs};
use crate::fetch::{FetchError, HttpClient};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::sink::ProgressSink;
use crate::storage::{self, StorageLayout, TempFile, TempFileGuard};
use crate::store::{Job, JobId, JobStatus, JobStore};

/// Samples buffered between the blocking transfer and the async reporter.
const SAMPLE_BUFFER: usize = 64;

/// Cancellation scope of one job: its own token plus the dispatcher root it
/// was derived from, so the worker can tell a user cancel from a shutdown.
#[derive(Debug, Clone)]
pub struct JobCancel {
    job: CancellationToken,
    root: CancellationToken,
    registration: Option<Registration>,
}

/// The dispatcher's registry entry for this run.
#[derive(Debug, Clone)]
struct Registration {
    active: Arc<ActiveJobs>,
    id: JobId,
    generation: u64,
}

impl JobCancel {
    /// Child scope of `root`; cancelling `root` cancels the job too.
    pub fn child_of(root: &CancellationToken) -> Self {
        Self {
            job: root.child_token(),
            root: root.clone(),
            registration: None,
        }
    }

    /// Bind the scope to the registry entry `guard` holds, so `commit` closes
    /// the window in which `ActiveJobs::cancel` can still reach the job.
    pub fn registered(mut self, active: Arc<ActiveJobs>, guard: &ActiveGuard<'_>) -> Self {
        self.registration = Some(Registration {
            active,
            id: guard.id(),
            generation: guard.generation(),
        });
        self
    }

    /// Scope with a private root, for running a job outside a dispatcher.
    pub fn detached() -> Self {
        Self::child_of(&CancellationToken::new())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.job
    }

    pub fn is_cancelled(&self) -> bool {
        self.job.is_cancelled()
    }

    pub fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Point of no return before publishing. False if the job was cancelled;
    /// after a true return a registry cancel of this run reports false.
    pub fn commit(&self) -> bool {
        match &self.registration {
            Some(r) => r.active.commit(r.id, r.generation),
            None => !self.is_cancelled(),
        }
    }

    /// The error recorded for a job stopped by this scope.
    pub fn error(&self) -> JobError {
        if self.is_shutdown() {
            JobError::ShutDown
        } else {
            JobError::Canceled
        }
    }

    fn payload_error(&self, e: FetchError) -> JobError {
        if e.is_canceled() {
            self.error()
        } else {
            JobError::Download(e)
        }
    }

    fn checksum_fetch_error(&self, e: FetchError) -> JobError {
        if e.is_canceled() {
            self.error()
        } else {
            JobError::ChecksumFetch(e)
        }
    }
}

/// Final result of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Complete { verified_checksum: Option<String> },
    Failed { message: String },
    /// The stored job was not pending; nothing ran and nothing was written.
    Skipped,
}

impl JobOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, JobOutcome::Complete { .. })
    }
}

/// Blocking transfer → async reporter.
#[derive(Debug)]
enum Sample {
    Size(u64),
    Percent(u8),
}

/// Executes jobs against a store, a disk layout and an HTTP client. Shared by
/// all worker loops of a dispatcher.
pub struct Worker {
    store: Arc<dyn JobStore>,
    layout: StorageLayout,
    http: HttpClient,
    persist_retry: RetryPolicy,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        layout: StorageLayout,
        http: HttpClient,
        persist_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            layout,
            http,
            persist_retry,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run `job` to a terminal state. Errors are recorded on the job, not
    /// returned; the caller only learns the outcome.
    ///
    /// The stored row is claimed (`pending → downloading`) first. A job that
    /// is no longer pending, e.g. a duplicate submission or a stale snapshot,
    /// is skipped without touching its row or files.
    pub async fn run(&self, job: &Job, cancel: &JobCancel, sink: &dyn ProgressSink) -> JobOutcome {
        match self.store.claim(job.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(job_id = job.id, "job is not pending; skipped");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                warn!(job_id = job.id, "could not claim job; left as is: {:#}", e);
                return JobOutcome::Skipped;
            }
        }

        let temp_path = self.layout.temp_path(job);
        let final_path = self.layout.final_path(job);
        let guard = TempFileGuard::new(&temp_path);
        let mut percent = 0u8;

        info!(job_id = job.id, url = %job.url, "job started");
        let result = self
            .execute(job, &temp_path, &final_path, cancel, sink, &mut percent)
            .await;
        drop(guard);

        match result {
            Ok(verified) => {
                self.record_complete(job.id, verified.as_deref()).await;
                sink.notify(job.id, 100, JobStatus::Complete);
                info!(job_id = job.id, path = %final_path.display(), "job complete");
                JobOutcome::Complete {
                    verified_checksum: verified,
                }
            }
            Err(e) => {
                let message = e.to_string();
                if e.is_canceled() {
                    info!(job_id = job.id, "job stopped: {}", message);
                } else {
                    warn!(job_id = job.id, "job failed: {}", message);
                }
                self.record_failed(job.id, &message).await;
                sink.notify(job.id, percent, JobStatus::Failed);
                JobOutcome::Failed { message }
            }
        }
    }

    async fn execute(
        &self,
        job: &Job,
        temp_path: &Path,
        final_path: &Path,
        cancel: &JobCancel,
        sink: &dyn ProgressSink,
        percent: &mut u8,
    ) -> Result<Option<String>, JobError> {
        self.layout
            .ensure_dirs()
            .await
            .map_err(|e| JobError::Storage(anyhow::Error::new(e).context("create storage directories")))?;
        if cancel.is_cancelled() {
            return Err(cancel.error());
        }

        sink.notify(job.id, 0, JobStatus::Downloading);

        let bytes = self.download(job, temp_path, cancel, sink, percent).await?;
        debug!(job_id = job.id, bytes, "payload stored in {}", temp_path.display());

        let verified = match (&job.checksum_url, job.checksum_algorithm) {
            (Some(url), Some(algorithm)) => {
                self.update_status(job.id, JobStatus::Verifying).await;
                sink.notify(job.id, *percent, JobStatus::Verifying);
                Some(self.verify(job, url, algorithm, temp_path, cancel).await?)
            }
            _ => None,
        };

        if !cancel.commit() {
            return Err(cancel.error());
        }
        storage::publish(temp_path, final_path).map_err(JobError::Storage)?;
        Ok(verified)
    }

    /// Stream the payload into the temp file on the blocking pool while this
    /// task persists and reports the samples in arrival order.
    async fn download(
        &self,
        job: &Job,
        temp_path: &Path,
        cancel: &JobCancel,
        sink: &dyn ProgressSink,
        percent: &mut u8,
    ) -> Result<u64, JobError> {
        let (tx, mut rx) = mpsc::channel::<Sample>(SAMPLE_BUFFER);
        let http = self.http.clone();
        let url = job.url.clone();
        let token = cancel.token().clone();
        let path: PathBuf = temp_path.to_path_buf();
        let need_size = job.size_bytes.is_none();

        let transfer = tokio::task::spawn_blocking(move || -> Result<u64, JobError> {
            let mut file = TempFile::create(&path).map_err(JobError::Storage)?;
            let mut tracker = ProgressTracker::new(None);
            let mut size_sent = !need_size;
            http.stream(&url, &token, |chunk, total| {
                file.write_chunk(chunk)?;
                if !size_sent {
                    size_sent = true;
                    if let Some(total) = total {
                        let _ = tx.blocking_send(Sample::Size(total));
                    }
                }
                tracker.set_total(total);
                if let Some(p) = tracker.advance(chunk.len() as u64) {
                    let _ = tx.blocking_send(Sample::Percent(p));
                }
                Ok(())
            })
            .map_err(JobError::Download)?;
            file.finish().map_err(JobError::Storage)
        });

        while let Some(sample) = rx.recv().await {
            match sample {
                Sample::Size(size) => {
                    if let Err(e) = self.store.set_size(job.id, size).await {
                        warn!(job_id = job.id, "could not record size: {:#}", e);
                    }
                }
                Sample::Percent(p) => {
                    *percent = p;
                    if let Err(e) = self.store.set_progress(job.id, p).await {
                        warn!(job_id = job.id, "could not record progress: {:#}", e);
                    }
                    sink.notify(job.id, p, JobStatus::Downloading);
                }
            }
        }

        match transfer.await? {
            Err(JobError::Download(e)) => Err(cancel.payload_error(e)),
            other => other,
        }
    }

    /// Fetch the checksum source, find the entry for the remote filename and
    /// compare it with the temp file's digest. Returns the verified digest.
    async fn verify(
        &self,
        job: &Job,
        checksum_url: &str,
        algorithm: HashAlgorithm,
        temp_path: &Path,
        cancel: &JobCancel,
    ) -> Result<String, JobError> {
        let http = self.http.clone();
        let url = checksum_url.to_string();
        let token = cancel.token().clone();
        let text = tokio::task::spawn_blocking(move || http.fetch_text(&url, &token))
            .await?
            .map_err(|e| cancel.checksum_fetch_error(e))?;

        let remote = job.remote_filename();
        let expected = checksum::find_checksum(&text, &remote)?;

        let path = temp_path.to_path_buf();
        let hashing = tokio::task::spawn_blocking(move || checksum::digest_path(&path, algorithm));
        let actual = tokio::select! {
            _ = cancel.token().cancelled() => return Err(cancel.error()),
            digest = hashing => digest??,
        };

        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(JobError::ChecksumMismatch { expected, actual });
        }
        debug!(job_id = job.id, %algorithm, "checksum verified");
        Ok(actual)
    }

    async fn update_status(&self, id: JobId, status: JobStatus) {
        if let Err(e) = self.store.set_status(id, status).await {
            warn!(job_id = id, "could not record status {}: {:#}", status, e);
        }
    }

    async fn record_complete(&self, id: JobId, verified: Option<&str>) {
        let store = &self.store;
        let r = run_with_retry(&self.persist_retry, "record completion", || {
            store.mark_complete(id, verified)
        })
        .await;
        if let Err(e) = r {
            error!(
                job_id = id,
                "artifact published but completion could not be recorded: {:#}", e
            );
        }
    }

    async fn record_failed(&self, id: JobId, message: &str) {
        let store = &self.store;
        let r = run_with_retry(&self.persist_retry, "record failure", || {
            store.mark_failed(id, message)
        })
        .await;
        if let Err(e) = r {
            error!(job_id = id, "failure could not be recorded: {:#}", e);
        }
    }
}
