//! `isofetch status` – show status of all jobs.

use anyhow::Result;
use isofetch_core::store::{Job, JobDb};

pub async fn run_status(db: &JobDb, json: bool) -> Result<()> {
    let jobs = db.list_jobs().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }
    if jobs.is_empty() {
        println!("No jobs in database.");
        return Ok(());
    }
    println!(
        "{:<6} {:<12} {:>5} {:>12}  {}",
        "ID", "STATUS", "PCT", "SIZE", "FILENAME"
    );
    for j in &jobs {
        println!("{}", format_row(j));
    }
    Ok(())
}

fn format_row(j: &Job) -> String {
    let size = j
        .size_bytes
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut row = format!(
        "{:<6} {:<12} {:>4}% {:>12}  {}",
        j.id,
        j.status.as_str(),
        j.progress,
        size,
        j.filename
    );
    if let Some(err) = &j.error_message {
        row.push_str(&format!("  ({err})"));
    }
    row
}
