//! Job read operations: list and get.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::JobDb;
use super::super::types::{Job, JobId, JobStatus};
use crate::checksum::HashAlgorithm;

const JOB_COLUMNS: &str = r#"
    id, url, filename, checksum_url, checksum_algorithm, status, progress,
    size_bytes, verified_checksum, error_message, created_at, completed_at
"#;

impl JobDb {
    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(job_from_row).collect()
    }

    /// Jobs in `status`, oldest first (submission order).
    pub async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE status = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(job_from_row).collect()
    }

    /// Fetch a single job.
    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let status: String = row.get("status");
    let algorithm: Option<String> = row.get("checksum_algorithm");
    let progress: i64 = row.get("progress");
    let size_bytes: Option<i64> = row.get("size_bytes");

    Ok(Job {
        id: row.get("id"),
        url: row.get("url"),
        filename: row.get("filename"),
        checksum_url: row.get("checksum_url"),
        checksum_algorithm: algorithm.as_deref().map(str::parse::<HashAlgorithm>).transpose()?,
        status: JobStatus::from_str(&status),
        progress: progress.clamp(0, 100) as u8,
        size_bytes: size_bytes.and_then(|s| u64::try_from(s).ok()),
        verified_checksum: row.get("verified_checksum"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    })
}
