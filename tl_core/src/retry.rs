//! ABOUTME: Bounded retry policy and a generic attempt-until helper
//! ABOUTME: Keeps the retry schedule separate from the operation being retried

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed,
    /// `delay * multiplier^(attempt - 1)`, capped at `max_delay`
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Bounded retry schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Base delay between attempts
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(
        max_attempts: u32,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            delay: initial_delay,
            backoff: Backoff::Exponential {
                multiplier,
                max_delay,
            },
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let delay_ms = self.delay.as_millis() as f64 * multiplier.powi(exponent);
                if !delay_ms.is_finite() || delay_ms >= max_delay.as_millis() as f64 {
                    return max_delay;
                }
                Duration::from_millis(delay_ms as u64).min(max_delay)
            }
        }
    }

    /// Sum of all sleeps performed when every attempt fails
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

/// Successful outcome together with the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Succeeded<T> {
    pub value: T,
    pub attempts: u32,
}

/// Every attempt failed; carries the last error seen
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts: {}", self.attempts, self.last)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. Failures before the last attempt
/// are logged at `warn` and followed by `policy.delay_for_attempt(attempt)`.
pub async fn retry_until<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> std::result::Result<Succeeded<T>, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(label, attempt, "Succeeded after retry");
                }
                return Ok(Succeeded {
                    value,
                    attempts: attempt,
                });
            }
            Err(e) if attempt >= max_attempts => {
                error!(label, attempts = attempt, error = %e, "All attempts failed");
                return Err(RetryError {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::fixed(30, Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(29), Duration::from_secs(2));
        assert_eq!(policy.total_delay(), Duration::from_secs(58));
    }

    #[test]
    fn test_exponential_delay_caps() {
        let policy = RetryPolicy::exponential(
            10,
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(5),
        );
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_succeeds_on_kth_attempt() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let outcome = retry_until(&policy, "flaky", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("refused on attempt {}", attempt))
                } else {
                    Ok("ready")
                }
            }
        })
        .await
        .expect("third attempt succeeds");

        assert_eq!(outcome.value, "ready");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_exactly_max_attempts() {
        let policy = RetryPolicy::fixed(4, Duration::from_millis(20));
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let err = retry_until(&policy, "down", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("connection refused") }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 4);
        assert_eq!(err.last, "connection refused");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // three sleeps between four attempts
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(err.to_string().contains("4 attempts"));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::fixed(0, Duration::from_millis(1));
        let outcome = retry_until(&policy, "once", |_| async { Ok::<_, String>(7) })
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
    }
}
