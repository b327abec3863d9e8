//! Job write operations: create, point updates, terminal states, retry, remove.
//!
//! Every update is keyed by id and idempotent. Status writes only apply when
//! the stored status may legally move to the new one, so a late or repeated
//! update cannot move a job backwards.

use anyhow::{bail, Context, Result};

use super::super::db::{unix_timestamp, JobDb};
use super::super::types::{Job, JobId, JobStatus, NewJob};

/// Message recorded on jobs found mid-flight at startup.
pub const INTERRUPTED_MESSAGE: &str = "interrupted before completion";

/// SQL list of the statuses allowed to move to `next`, e.g. `'pending', 'downloading'`.
fn allowed_from(next: JobStatus) -> String {
    JobStatus::ALL
        .iter()
        .filter(|s| s.can_transition_to(next))
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl JobDb {
    /// Validate and insert a new pending job; returns the stored record.
    pub async fn create_job(&self, new: &NewJob) -> Result<Job> {
        new.validate().map_err(anyhow::Error::msg)?;
        let now = unix_timestamp();
        let filename = new.resolved_filename();

        let holder: Option<i64> = sqlx::query_scalar("SELECT id FROM jobs WHERE filename = ?1")
            .bind(&filename)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(holder) = holder {
            bail!("filename {filename} is already used by job {holder}");
        }

        let id = sqlx::query(
            r#"
            INSERT INTO jobs (
                url, filename, checksum_url, checksum_algorithm,
                status, progress, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
            "#,
        )
        .bind(&new.url)
        .bind(&filename)
        .bind(&new.checksum_url)
        .bind(new.checksum_algorithm.map(|a| a.as_str()))
        .bind(JobStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert job for {filename}"))?
        .last_insert_rowid();

        self.get_job(id)
            .await?
            .with_context(|| format!("job {id} vanished after insert"))
    }

    /// Claim a pending job for execution: `pending → downloading`, progress
    /// reset to 0. Returns `false` when the stored row is not pending, so a
    /// stale or duplicate submission never runs a job twice.
    pub async fn claim(&self, id: JobId) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'downloading',
                progress = 0,
                updated_at = ?1
            WHERE id = ?2 AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Move a job to `status`. No-op unless the stored status may move there.
    pub async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        let now = unix_timestamp();
        let sql = format!(
            "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN ({})",
            allowed_from(status)
        );
        sqlx::query(&sql)
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_progress(&self, id: JobId, percent: u8) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET progress = ?1,
                updated_at = ?2
            WHERE id = ?3 AND status IN ('downloading', 'verifying')
            "#,
        )
        .bind(i64::from(percent.min(100)))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_size(&self, id: JobId, size_bytes: u64) -> Result<()> {
        let size = i64::try_from(size_bytes).context("size does not fit in i64")?;
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET size_bytes = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(size)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal success: status, progress 100, verified checksum, completion time.
    pub async fn mark_complete(&self, id: JobId, verified_checksum: Option<&str>) -> Result<()> {
        let now = unix_timestamp();
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'complete',
                progress = 100,
                verified_checksum = ?1,
                error_message = NULL,
                completed_at = ?2,
                updated_at = ?2
            WHERE id = ?3 AND status IN ({})
            "#,
            allowed_from(JobStatus::Complete)
        );
        sqlx::query(&sql)
            .bind(verified_checksum)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Terminal failure with a human-readable message.
    pub async fn mark_failed(&self, id: JobId, message: &str) -> Result<()> {
        let now = unix_timestamp();
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = ?1,
                completed_at = ?2,
                updated_at = ?2
            WHERE id = ?3 AND status IN ({})
            "#,
            allowed_from(JobStatus::Failed)
        );
        sqlx::query(&sql)
            .bind(message)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Explicit retry: `failed → pending`, clearing the previous attempt's
    /// outcome. Any other current status is an error.
    pub async fn reset_for_retry(&self, id: JobId) -> Result<Job> {
        let Some(job) = self.get_job(id).await? else {
            bail!("job {id} not found");
        };
        if !job.status.can_transition_to(JobStatus::Pending) {
            bail!("job {id} is {}; only failed jobs can be retried", job.status);
        }
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                progress = 0,
                verified_checksum = NULL,
                error_message = NULL,
                completed_at = NULL,
                updated_at = ?1
            WHERE id = ?2 AND status = 'failed'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.get_job(id)
            .await?
            .with_context(|| format!("job {id} vanished during retry"))
    }

    /// Mark any job left in `downloading`/`verifying` (e.g. after a crash) as
    /// failed so it can be retried. Partial files are not resumed.
    /// Returns the number of jobs recovered.
    pub async fn recover_interrupted(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = ?1,
                updated_at = ?2
            WHERE status IN ('downloading', 'verifying')
            "#,
        )
        .bind(INTERRUPTED_MESSAGE)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Permanently remove a job row. File cleanup is left to the caller.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
