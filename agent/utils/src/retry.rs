use log::debug;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// A bounded retry with a fixed delay between attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first try and is never less than one.
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Deleting a resource while its dependents are still being released (VPCs, IAM roles, buckets).
pub const DEPENDENCY_RETRY: RetryPolicy = RetryPolicy::new(60, Duration::from_secs(5));

/// A single extra attempt after a short pause.
pub const ONE_RETRY: RetryPolicy = RetryPolicy::new(2, Duration::from_secs(2));

/// Runs `operation` until it succeeds, fails with an error `is_retryable` rejects, or the policy's
/// attempts are used up. The last error is returned.
pub async fn retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    what: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts && is_retryable(&e) => {
                debug!(
                    "{} failed on attempt {}/{}, retrying in {:?}: {}",
                    what, attempt, policy.attempts, policy.delay, e
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1));

    #[tokio::test]
    async fn succeeds_after_retryable_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = retry(FAST, "flaky", |e| e == "busy", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err("busy".to_string())
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = retry(FAST, "always busy", |_| true, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("busy".to_string())
        })
        .await;
        assert_eq!(result.unwrap_err(), "busy");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_fatal_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = retry(FAST, "fatal", |e| e == "busy", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("denied".to_string())
        })
        .await;
        assert_eq!(result.unwrap_err(), "denied");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).attempts(), 1);
        assert_eq!(DEPENDENCY_RETRY.attempts(), 60);
        assert_eq!(ONE_RETRY.attempts(), 2);
    }
}
