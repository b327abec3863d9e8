//! Disk layout and file lifecycle.
//!
//! Payloads are written to `<scratch>/<storage key>.part` and only become
//! visible under `<publish>/<filename>` through an atomic rename after all
//! checks pass. The scratch directory must live on the same filesystem as the
//! publish directory for the rename to be atomic.

mod guard;
mod writer;

pub use guard::TempFileGuard;
pub use writer::{publish, TempFile};

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::FetchConfig;
use crate::store::Job;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Default scratch directory name inside the publish directory.
pub const SCRATCH_DIR_NAME: &str = ".partial";

/// Where a job's temp and final files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    publish_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(publish_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            publish_dir: publish_dir.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Layout with the scratch directory nested in the publish directory.
    pub fn under(publish_dir: impl Into<PathBuf>) -> Self {
        let publish_dir = publish_dir.into();
        let scratch_dir = publish_dir.join(SCRATCH_DIR_NAME);
        Self::new(publish_dir, scratch_dir)
    }

    /// Resolve directories from config, falling back to the XDG data dir.
    pub fn from_config(cfg: &FetchConfig) -> Result<Self> {
        let publish_dir = match &cfg.publish_dir {
            Some(dir) => dir.clone(),
            None => crate::config::default_publish_dir()?,
        };
        Ok(match &cfg.scratch_dir {
            Some(scratch) => Self::new(publish_dir, scratch.clone()),
            None => Self::under(publish_dir),
        })
    }

    pub fn publish_dir(&self) -> &Path {
        &self.publish_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Scratch path, unique per job: `<scratch>/<id>-<filename>.part`.
    pub fn temp_path(&self, job: &Job) -> PathBuf {
        let mut name = job.storage_key();
        name.push_str(TEMP_SUFFIX);
        self.scratch_dir.join(name)
    }

    /// Public path the artifact is published under.
    pub fn final_path(&self, job: &Job) -> PathBuf {
        self.publish_dir.join(&job.filename)
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        tokio::fs::create_dir_all(&self.publish_dir).await
    }
}
