#![allow(dead_code)]

pub mod http_server;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use isofetch_core::fetch::HttpClient;
use isofetch_core::retry::RetryPolicy;
use isofetch_core::storage::StorageLayout;
use isofetch_core::store::JobDb;
use isofetch_core::worker::Worker;

/// File-backed job DB under `dir` plus a worker publishing into `dir/public`.
pub async fn worker_in(dir: &Path) -> (Arc<JobDb>, Worker) {
    let db = Arc::new(JobDb::open_at(dir.join("state").join("jobs.db")).await.unwrap());
    let worker = Worker::new(
        db.clone(),
        StorageLayout::under(dir.join("public")),
        HttpClient::default(),
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(5),
        },
    );
    (db, worker)
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}
