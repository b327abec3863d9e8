//! Bounded retry with fixed backoff for store writes.
//!
//! The worker uses this for the terminal status write: a transient store
//! failure must not strand a finished download in a non-terminal state.

mod policy;
mod run;

pub use policy::RetryPolicy;
pub use run::run_with_retry;
