//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;

use super::policy::RetryPolicy;

/// Runs `op` until it succeeds or the policy's attempts are used up, sleeping
/// the fixed delay between attempts. Each failure is logged with `what`.
/// Returns the last error when every attempt failed.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.next_delay(attempt) {
                None => return Err(e),
                Some(delay) => {
                    tracing::warn!(attempt, "{} failed, retrying in {:?}: {}", what, delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            },
        }
    }
}
