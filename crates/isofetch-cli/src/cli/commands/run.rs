//! `isofetch run` – drain pending jobs through the dispatcher.

use anyhow::Result;
use isofetch_core::config::FetchConfig;
use isofetch_core::control;
use isofetch_core::dispatcher::{Dispatcher, DispatcherOptions};
use isofetch_core::fetch::{HttpClient, HttpOptions};
use isofetch_core::retry::RetryPolicy;
use isofetch_core::sink::{ChannelSink, ProgressEvent};
use isofetch_core::storage::StorageLayout;
use isofetch_core::store::{JobDb, JobId, JobStatus};
use isofetch_core::worker::Worker;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::control_socket;

/// The sink drops events under pressure, so completion is also confirmed
/// from the database at this interval.
const STORE_POLL: Duration = Duration::from_secs(2);

pub async fn run_dispatcher(db: &JobDb, cfg: &FetchConfig, workers: Option<usize>) -> Result<()> {
    let recovered = db.recover_interrupted().await?;
    if recovered > 0 {
        tracing::info!("marked {} interrupted job(s) as failed", recovered);
        println!("{recovered} job(s) interrupted by a previous run are now failed; use `isofetch retry`.");
    }

    let pending = db.list_by_status(JobStatus::Pending).await?;
    if pending.is_empty() {
        println!("No pending jobs.");
        return Ok(());
    }

    let layout = StorageLayout::from_config(cfg)?;
    let persist_retry: RetryPolicy = cfg.persist_retry.clone().unwrap_or_default().into();
    let worker = Worker::new(
        Arc::new(db.clone()),
        layout,
        HttpClient::new(HttpOptions::from_config(cfg)),
        persist_retry,
    );
    let mut opts = DispatcherOptions::from_config(cfg);
    if let Some(n) = workers {
        opts.workers = n.max(1);
    }
    let dispatcher = Arc::new(Dispatcher::new(worker, opts));
    let (sink, mut events) = ChannelSink::new(256);
    dispatcher.set_progress_sink(Arc::new(sink));
    dispatcher.start();

    let socket_path = control::default_control_socket_path().ok();
    let listener = socket_path.as_ref().and_then(|path| {
        match control_socket::spawn_control_listener(Arc::clone(&dispatcher), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("control socket unavailable: {:#}", e);
                None
            }
        }
    });

    let run_ids: Vec<JobId> = pending.iter().map(|j| j.id).collect();
    let mut remaining: HashSet<JobId> = run_ids.iter().copied().collect();
    println!("Running {} job(s) with {} worker(s)", remaining.len(), opts.workers);

    let submitter = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            for job in pending {
                let id = job.id;
                if let Err(e) = dispatcher.submit(job).await {
                    tracing::warn!(job_id = id, "not queued: {}", e);
                    break;
                }
            }
        })
    };

    let mut poll = tokio::time::interval(STORE_POLL);
    let mut interrupted = false;
    while !remaining.is_empty() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted; stopping downloads (pending jobs are kept).");
                interrupted = true;
                break;
            }
            Some(ev) = events.recv() => {
                print_event(&ev);
                if ev.status.is_terminal() {
                    remaining.remove(&ev.job_id);
                }
            }
            _ = poll.tick() => {
                let mut done = Vec::new();
                for id in &remaining {
                    if let Some(job) = db.get_job(*id).await? {
                        if job.status.is_terminal() {
                            done.push(*id);
                        }
                    } else {
                        done.push(*id);
                    }
                }
                for id in done {
                    remaining.remove(&id);
                }
            }
        }
    }

    dispatcher.shutdown().await;
    submitter.abort();
    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(path) = socket_path {
        let _ = std::fs::remove_file(path);
    }

    if !interrupted {
        summarize(db, &run_ids).await?;
    }
    Ok(())
}

fn print_event(ev: &ProgressEvent) {
    match ev.status {
        JobStatus::Downloading => println!("  job {:<4} downloading {:>3}%", ev.job_id, ev.percent),
        status => println!("  job {:<4} {}", ev.job_id, status),
    }
}

async fn summarize(db: &JobDb, ids: &[JobId]) -> Result<()> {
    let mut jobs = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(job) = db.get_job(*id).await? {
            jobs.push(job);
        }
    }
    let complete = jobs.iter().filter(|j| j.status == JobStatus::Complete).count();
    let failed: Vec<_> = jobs.iter().filter(|j| j.status == JobStatus::Failed).collect();
    println!("{complete} of {} job(s) complete", ids.len());
    tracing::info!(complete, failed = failed.len(), "run finished");
    for j in failed {
        println!(
            "  job {} failed: {}",
            j.id,
            j.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
