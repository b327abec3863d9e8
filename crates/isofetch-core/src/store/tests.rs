//! Tests for the job store (in-memory DB helper from db).

use super::db::open_memory;
use super::{JobStatus, JobStore, NewJob, INTERRUPTED_MESSAGE};
use crate::checksum::HashAlgorithm;

#[tokio::test]
async fn create_and_get_roundtrip() {
    let db = open_memory().await.unwrap();
    let new = NewJob::new("https://mirror.example.org/debian-12.iso")
        .with_checksum("https://mirror.example.org/SHA256SUMS", HashAlgorithm::Sha256);
    let job = db.create_job(&new).await.unwrap();

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.progress, 0);
    assert_eq!(job.filename, "debian-12.iso");
    assert_eq!(job.checksum_algorithm, Some(HashAlgorithm::Sha256));
    assert_eq!(job.size_bytes, None);
    assert!(job.completed_at.is_none());

    let fetched = db.get_job(job.id).await.unwrap().expect("job exists");
    assert_eq!(fetched, job);
    assert!(db.get_job(job.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_invalid_jobs() {
    let db = open_memory().await.unwrap();
    assert!(db.create_job(&NewJob::new("ftp://example.com/a.iso")).await.is_err());
    assert!(db.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn filename_override_is_stored() {
    let db = open_memory().await.unwrap();
    let job = db
        .create_job(&NewJob::new("https://example.com/latest").with_filename("alpine-3.20.iso"))
        .await
        .unwrap();
    assert_eq!(job.filename, "alpine-3.20.iso");
    assert_eq!(job.remote_filename(), "latest");
}

#[tokio::test]
async fn duplicate_filename_is_rejected() {
    let db = open_memory().await.unwrap();
    let first = db.create_job(&NewJob::new("https://a.example/a/disk.iso")).await.unwrap();

    // Different URL, same published name.
    let err = db
        .create_job(&NewJob::new("https://b.example/b/disk.iso"))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("disk.iso"), "{msg}");
    assert!(msg.contains(&format!("job {}", first.id)), "{msg}");

    // An explicit override colliding with a derived name is rejected too.
    assert!(db
        .create_job(&NewJob::new("https://b.example/latest").with_filename("disk.iso"))
        .await
        .is_err());
    assert_eq!(db.list_jobs().await.unwrap().len(), 1);

    // Removing the holder frees the name.
    db.remove_job(first.id).await.unwrap();
    let second = db.create_job(&NewJob::new("https://b.example/b/disk.iso")).await.unwrap();
    assert_eq!(second.filename, "disk.iso");
}

#[tokio::test]
async fn filename_uniqueness_is_enforced_by_schema() {
    let db = open_memory().await.unwrap();
    db.create_job(&NewJob::new("https://a.example/dup.iso")).await.unwrap();
    let raw = sqlx::query(
        "INSERT INTO jobs (url, filename, status, created_at, updated_at) \
         VALUES ('https://b.example/dup.iso', 'dup.iso', 'pending', 0, 0)",
    )
    .execute(&db.pool)
    .await;
    assert!(raw.is_err());
}

#[tokio::test]
async fn claim_only_takes_pending_jobs() {
    let db = open_memory().await.unwrap();
    let job = db.create_job(&NewJob::new("https://a.example/c.img")).await.unwrap();

    assert!(db.claim(job.id).await.unwrap());
    let j = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Downloading);
    assert_eq!(j.progress, 0);

    // A second claim of the same job loses.
    assert!(!db.claim(job.id).await.unwrap());

    db.mark_failed(job.id, "HTTP 404").await.unwrap();
    assert!(!db.claim(job.id).await.unwrap(), "failed needs an explicit retry");
    let j = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Failed);

    db.reset_for_retry(job.id).await.unwrap();
    assert!(db.claim(job.id).await.unwrap());
    assert!(!db.claim(9999).await.unwrap());
}

#[tokio::test]
async fn status_writes_follow_the_lifecycle() {
    let db = open_memory().await.unwrap();
    let job = db.create_job(&NewJob::new("https://a.example/l.img")).await.unwrap();

    // Pending cannot skip straight to verifying or complete.
    db.set_status(job.id, JobStatus::Verifying).await.unwrap();
    db.mark_complete(job.id, None).await.unwrap();
    db.set_progress(job.id, 50).await.unwrap();
    let j = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Pending);
    assert_eq!(j.progress, 0);

    db.mark_failed(job.id, "boom").await.unwrap();
    // Failed only leaves through reset_for_retry.
    db.set_status(job.id, JobStatus::Downloading).await.unwrap();
    db.set_status(job.id, JobStatus::Pending).await.unwrap();
    let j = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Failed);
    assert_eq!(j.error_message.as_deref(), Some("boom"));
}

#[tokio::test]
async fn point_updates() {
    let db = open_memory().await.unwrap();
    let job = db.create_job(&NewJob::new("https://a.example/x.img")).await.unwrap();

    db.set_status(job.id, JobStatus::Downloading).await.unwrap();
    db.set_progress(job.id, 42).await.unwrap();
    db.set_size(job.id, 5 * 1024 * 1024 * 1024).await.unwrap();

    let j = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Downloading);
    assert_eq!(j.progress, 42);
    assert_eq!(j.size_bytes, Some(5 * 1024 * 1024 * 1024));
}

#[tokio::test]
async fn complete_is_final() {
    let db = open_memory().await.unwrap();
    let job = db.create_job(&NewJob::new("https://a.example/x.img")).await.unwrap();
    db.set_status(job.id, JobStatus::Downloading).await.unwrap();
    db.mark_complete(job.id, Some("abc123")).await.unwrap();

    // Late writes must not move a complete job.
    db.set_status(job.id, JobStatus::Downloading).await.unwrap();
    db.set_progress(job.id, 3).await.unwrap();
    db.mark_failed(job.id, "late failure").await.unwrap();

    let j = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Complete);
    assert_eq!(j.progress, 100);
    assert_eq!(j.verified_checksum.as_deref(), Some("abc123"));
    assert!(j.error_message.is_none());
    assert!(j.completed_at.is_some());
    assert!(db.reset_for_retry(job.id).await.is_err());
}

#[tokio::test]
async fn failed_job_can_be_retried() {
    let db = open_memory().await.unwrap();
    let job = db.create_job(&NewJob::new("https://a.example/x.img")).await.unwrap();
    db.set_status(job.id, JobStatus::Downloading).await.unwrap();
    db.set_progress(job.id, 60).await.unwrap();
    db.mark_failed(job.id, "HTTP 503").await.unwrap();

    let failed = db.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("HTTP 503"));

    let retried = db.reset_for_retry(job.id).await.unwrap();
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.progress, 0);
    assert!(retried.error_message.is_none());
    assert!(retried.completed_at.is_none());
}

#[tokio::test]
async fn retry_rejects_pending_and_missing() {
    let db = open_memory().await.unwrap();
    let job = db.create_job(&NewJob::new("https://a.example/x.img")).await.unwrap();
    assert!(db.reset_for_retry(job.id).await.is_err());
    assert!(db.reset_for_retry(9999).await.is_err());
}

#[tokio::test]
async fn recover_interrupted_marks_in_flight_failed() {
    let db = open_memory().await.unwrap();
    let a = db.create_job(&NewJob::new("https://a.example/a.img")).await.unwrap();
    let b = db.create_job(&NewJob::new("https://a.example/b.img")).await.unwrap();
    let c = db.create_job(&NewJob::new("https://a.example/c.img")).await.unwrap();
    db.set_status(a.id, JobStatus::Downloading).await.unwrap();
    db.set_status(b.id, JobStatus::Downloading).await.unwrap();
    db.set_status(b.id, JobStatus::Verifying).await.unwrap();

    assert_eq!(db.recover_interrupted().await.unwrap(), 2);
    for id in [a.id, b.id] {
        let j = db.get_job(id).await.unwrap().unwrap();
        assert_eq!(j.status, JobStatus::Failed);
        assert_eq!(j.error_message.as_deref(), Some(INTERRUPTED_MESSAGE));
    }
    let untouched = db.get_job(c.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, JobStatus::Pending);
}

#[tokio::test]
async fn list_orders() {
    let db = open_memory().await.unwrap();
    let one = db.create_job(&NewJob::new("https://a.example/one.iso")).await.unwrap();
    let two = db.create_job(&NewJob::new("https://a.example/two.iso")).await.unwrap();
    db.mark_failed(one.id, "boom").await.unwrap();
    let three = db.create_job(&NewJob::new("https://a.example/three.iso")).await.unwrap();

    let all = db.list_jobs().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, three.id, "newest first");

    let pending = db.list_by_status(JobStatus::Pending).await.unwrap();
    let ids: Vec<_> = pending.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![two.id, three.id], "oldest first");

    db.remove_job(two.id).await.unwrap();
    assert_eq!(db.list_jobs().await.unwrap().len(), 2);
}

#[tokio::test]
async fn trait_object_delegates_to_db() {
    let db = open_memory().await.unwrap();
    let store: &dyn JobStore = &db;
    let job = store.create(&NewJob::new("https://a.example/t.img")).await.unwrap();
    assert!(store.claim(job.id).await.unwrap());
    store.mark_complete(job.id, None).await.unwrap();
    let j = store.get(job.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Complete);
    assert!(j.verified_checksum.is_none());
}
