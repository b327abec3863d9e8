//! `isofetch add <url>` – add a download job.

use anyhow::Result;
use isofetch_core::checksum::HashAlgorithm;
use isofetch_core::store::{JobDb, NewJob};

pub async fn run_add(
    db: &JobDb,
    url: String,
    name: Option<String>,
    checksum_url: Option<String>,
    algorithm: Option<HashAlgorithm>,
) -> Result<()> {
    let new = NewJob {
        url,
        filename: name,
        checksum_url,
        checksum_algorithm: algorithm,
    };
    let job = db.create_job(&new).await?;
    println!("Added job {}: {} -> {}", job.id, job.url, job.filename);
    Ok(())
}
