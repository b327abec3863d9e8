//! Why a job failed. The `Display` text is what ends up in `error_message`.

use crate::checksum::ChecksumError;
use crate::fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Payload request, status, transfer or temp-file write failure.
    #[error(transparent)]
    Download(FetchError),
    #[error("download canceled")]
    Canceled,
    #[error("download canceled (shutdown)")]
    ShutDown,
    #[error("checksum fetch failed: {0}")]
    ChecksumFetch(#[source] FetchError),
    /// Unparseable source, missing entry or unreadable temp file.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("{0:#}")]
    Storage(anyhow::Error),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl JobError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, JobError::Canceled | JobError::ShutDown)
    }
}
