//! Durable job records (SQLite via sqlx) and the store contract the worker
//! writes through.
//!
//! The worker only needs point writes keyed by job id; `JobStore` captures
//! exactly that so tests (and other backends) can stand in for `JobDb`.

mod db;
mod jobs;
mod types;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

pub use db::JobDb;
#[cfg(test)]
pub(crate) use db::open_memory;
pub use jobs::INTERRUPTED_MESSAGE;
pub use types::{Job, JobId, JobStatus, NewJob};

/// Store operations used during job execution. Implementations must be safe
/// for concurrent calls from several workers; each call is an independent,
/// idempotent point write.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, new: &NewJob) -> Result<Job>;
    async fn get(&self, id: JobId) -> Result<Option<Job>>;
    /// `pending → downloading`; `false` if the job is not pending.
    async fn claim(&self, id: JobId) -> Result<bool>;
    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()>;
    async fn set_progress(&self, id: JobId, percent: u8) -> Result<()>;
    async fn set_size(&self, id: JobId, size_bytes: u64) -> Result<()>;
    async fn mark_complete(&self, id: JobId, verified_checksum: Option<&str>) -> Result<()>;
    async fn mark_failed(&self, id: JobId, message: &str) -> Result<()>;
}

#[async_trait]
impl JobStore for JobDb {
    async fn create(&self, new: &NewJob) -> Result<Job> {
        self.create_job(new).await
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        self.get_job(id).await
    }

    async fn claim(&self, id: JobId) -> Result<bool> {
        JobDb::claim(self, id).await
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        JobDb::set_status(self, id, status).await
    }

    async fn set_progress(&self, id: JobId, percent: u8) -> Result<()> {
        JobDb::set_progress(self, id, percent).await
    }

    async fn set_size(&self, id: JobId, size_bytes: u64) -> Result<()> {
        JobDb::set_size(self, id, size_bytes).await
    }

    async fn mark_complete(&self, id: JobId, verified_checksum: Option<&str>) -> Result<()> {
        JobDb::mark_complete(self, id, verified_checksum).await
    }

    async fn mark_failed(&self, id: JobId, message: &str) -> Result<()> {
        JobDb::mark_failed(self, id, message).await
    }
}
