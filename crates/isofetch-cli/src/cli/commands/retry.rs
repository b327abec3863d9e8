//! `isofetch retry <id>` – move a failed job back to pending.

use anyhow::Result;
use isofetch_core::store::JobDb;

pub async fn run_retry(db: &JobDb, id: i64) -> Result<()> {
    let job = db.reset_for_retry(id).await?;
    println!(
        "Job {} is pending again; `isofetch run` will download {}",
        job.id, job.filename
    );
    Ok(())
}
