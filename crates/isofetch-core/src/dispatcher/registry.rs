//! Registry of running jobs and their cancellation tokens.
//!
//! Each registration gets a generation number; the RAII guard only removes
//! the entry it created, so a job finishing late can never unregister a newer
//! run of the same id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::store::JobId;

#[derive(Debug)]
struct Entry {
    generation: u64,
    token: CancellationToken,
}

/// Job id → cancellation token of the run currently executing it.
#[derive(Debug, Default)]
pub struct ActiveJobs {
    jobs: RwLock<HashMap<JobId, Entry>>,
    next_generation: AtomicU64,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job. Returns `None` if the id is already active;
    /// at most one cancellation handle exists per job.
    pub fn register(&self, id: JobId, token: CancellationToken) -> Option<ActiveGuard<'_>> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&id) {
            return None;
        }
        jobs.insert(id, Entry { generation, token });
        Some(ActiveGuard {
            registry: self,
            id,
            generation,
        })
    }

    /// Remove the job's entry and fire its token, both under the write lock.
    /// Returns false if the job is not active (finished, never started, or
    /// already cancelled).
    pub fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.remove(&id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Close the cancellation window of a run about to publish: drop its
    /// entry and report whether it may go on. False if the run was already
    /// cancelled (here or through its root) or the entry is not this run's.
    pub fn commit(&self, id: JobId, generation: u64) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.get(&id) {
            Some(entry) if entry.generation == generation => {
                let live = !entry.token.is_cancelled();
                jobs.remove(&id);
                live
            }
            _ => false,
        }
    }

    pub fn is_active(&self, id: JobId) -> bool {
        self.jobs.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Active ids in ascending order.
    pub fn ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn unregister(&self, id: JobId, generation: u64) {
        let mut jobs = self.jobs.write();
        if jobs.get(&id).is_some_and(|e| e.generation == generation) {
            jobs.remove(&id);
        }
    }
}

/// Unregisters its job on drop, on every exit path of a run.
pub struct ActiveGuard<'a> {
    registry: &'a ActiveJobs,
    id: JobId,
    generation: u64,
}

impl ActiveGuard<'_> {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.id, self.generation);
    }
}
