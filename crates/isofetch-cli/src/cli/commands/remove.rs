//! `isofetch remove <id>` – remove a job; optionally delete its files with --delete-files.

use anyhow::{bail, Result};
use isofetch_core::config::FetchConfig;
use isofetch_core::storage::StorageLayout;
use isofetch_core::store::JobDb;

/// Removes the job from the DB. With `delete_files`, also deletes the
/// published image and any leftover partial file. Running jobs are refused.
pub async fn run_remove(db: &JobDb, cfg: &FetchConfig, id: i64, delete_files: bool) -> Result<()> {
    let Some(job) = db.get_job(id).await? else {
        bail!("job {id} not found");
    };
    if job.status.is_cancellable() {
        bail!("job {id} is {}; cancel it first", job.status);
    }

    if delete_files {
        let layout = StorageLayout::from_config(cfg)?;
        for path in [layout.temp_path(&job), layout.final_path(&job)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "deleted file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "could not delete file: {}", e),
            }
        }
    }

    db.remove_job(id).await?;
    println!("Removed job {id}");
    Ok(())
}
