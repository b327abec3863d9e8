//! Types used by the job store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checksum::HashAlgorithm;
use crate::url_model;

/// Job identifier.
pub type JobId = i64;

/// Lifecycle state of a job, stored as a lowercase string.
///
/// `Pending → Downloading → (Verifying)? → Complete | Failed`, plus
/// `Failed → Pending` through an explicit retry. Nothing leaves `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Verifying,
    Complete,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Downloading,
        JobStatus::Verifying,
        JobStatus::Complete,
        JobStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Verifying => "verifying",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// Unknown strings map to `Failed` so a corrupt row is retryable rather
    /// than stuck.
    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "downloading" => JobStatus::Downloading,
            "verifying" => JobStatus::Verifying,
            "complete" => JobStatus::Complete,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    /// Only an in-flight transfer or verification can be cancelled.
    pub fn is_cancellable(self) -> bool {
        matches!(self, JobStatus::Downloading | JobStatus::Verifying)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Downloading, Verifying)
                | (Downloading, Complete)
                | (Verifying, Complete)
                | (Pending | Downloading | Verifying, Failed)
                | (Failed, Pending)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied fields for a new job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJob {
    pub url: String,
    /// Publish name; derived from the URL when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_algorithm: Option<HashAlgorithm>,
}

impl NewJob {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_checksum(mut self, checksum_url: impl Into<String>, algorithm: HashAlgorithm) -> Self {
        self.checksum_url = Some(checksum_url.into());
        self.checksum_algorithm = Some(algorithm);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Synchronous validation, run before a job is stored or queued.
    pub fn validate(&self) -> Result<(), String> {
        validate_fields(
            &self.url,
            self.checksum_url.as_deref(),
            self.checksum_algorithm,
        )
    }

    /// The name the artifact is published under.
    pub fn resolved_filename(&self) -> String {
        url_model::local_filename(&self.url, self.filename.as_deref())
    }
}

/// Full job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub filename: String,
    pub checksum_url: Option<String>,
    pub checksum_algorithm: Option<HashAlgorithm>,
    pub status: JobStatus,
    pub progress: u8,
    pub size_bytes: Option<u64>,
    pub verified_checksum: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl Job {
    /// Unique, deterministic key for this job's scratch files.
    pub fn storage_key(&self) -> String {
        format!("{}-{}", self.id, self.filename)
    }

    /// Name of the artifact on the remote side; checksum files list it under
    /// this name, which may differ from the local `filename`.
    pub fn remote_filename(&self) -> String {
        url_model::remote_filename(&self.url).unwrap_or_else(|| self.filename.clone())
    }

    /// Checks a job is fit to enter the dispatcher queue.
    pub fn validate(&self) -> Result<(), String> {
        if self.status != JobStatus::Pending {
            return Err(format!("job {} is {}, not pending", self.id, self.status));
        }
        if self.filename.is_empty() {
            return Err(format!("job {} has no filename", self.id));
        }
        validate_fields(
            &self.url,
            self.checksum_url.as_deref(),
            self.checksum_algorithm,
        )
    }
}

fn validate_fields(
    url: &str,
    checksum_url: Option<&str>,
    algorithm: Option<HashAlgorithm>,
) -> Result<(), String> {
    url_model::validate_source_url(url)?;
    match (checksum_url, algorithm) {
        (Some(c), Some(_)) => {
            url_model::validate_source_url(c)?;
            Ok(())
        }
        (None, None) => Ok(()),
        (Some(_), None) => Err("checksum URL given without an algorithm".to_string()),
        (None, Some(_)) => Err("checksum algorithm given without a checksum URL".to_string()),
    }
}
