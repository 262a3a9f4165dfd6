use std::{future::Future, time::Duration};

use rand::Rng;
use tracing::debug;

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};

/// How an attempt failed: transient errors are retried within the budget,
/// fatal errors end the loop immediately.
#[derive(Debug)]
pub enum AttemptError<E> {
    Transient(E),
    Fatal(E),
}

/// Bounded-retry policy: a fixed number of attempts with a fixed delay in
/// between, plus optional random jitter. Delays go through `tokio::time`, so
/// a paused test clock drives them.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub jitter: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            jitter: None,
        }
    }
}

impl RetryPolicy {
    /// Run `f` until it succeeds, fails fatally, or the attempt budget is
    /// exhausted; the attempt number (starting at 1) is passed in for
    /// logging. The error of the last attempt is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, mut f: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
    {
        let mut attempt = 1;
        loop {
            match f(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Transient(err)) => {
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    debug!(attempt, "transient failure, retrying: {}", err);
                    self.wait().await;
                    attempt += 1;
                }
            }
        }
    }

    async fn wait(&self) {
        let mut delay = self.delay;
        if let Some(jitter) = self.jitter {
            let extra = rand::thread_rng().gen_range(0..=jitter.as_millis() as u64);
            delay += Duration::from_millis(extra);
        }
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(max_attempts: u32, delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
            jitter: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u32, &str> = policy(3, 1000)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AttemptError::Transient("not yet"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // two inter-attempt delays of one second
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_the_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), &str> = policy(3, 10)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::Transient("down")) }
            })
            .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_stop_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), &str> = policy(3, 10)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::Fatal("expired")) }
            })
            .await;

        assert_eq!(result, Err("expired"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
