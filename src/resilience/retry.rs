// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Whole-fold retry with exponential backoff.
//!
//! The leaf materializer never retries on its own; the caller decides which
//! failures are worth another attempt and how long to wait between them.
//!
//! ```
//! use geo_range_index::RetryConfig;
//!
//! assert_eq!(RetryConfig::interactive().max_attempts, Some(3));
//! assert_eq!(RetryConfig::publisher().max_attempts, None); // until it lands
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Backoff policy. `max_attempts` includes the first try; `None` means
/// keep going until the operation succeeds or fails permanently.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: Option<usize>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

impl RetryConfig {
    /// Three attempts, 100ms doubling to at most 2s. Suits a caller waiting
    /// on the root; matches the `AssemblerConfig` defaults.
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            max_attempts: Some(3),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }

    /// Unbounded attempts, 1s doubling to at most 5 minutes. For background
    /// publishers that must eventually land the index.
    #[must_use]
    pub fn publisher() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }

    fn backoff(&self) -> Backoff<'_> {
        Backoff { config: self, attempt: 0, next: self.initial_delay }
    }
}

/// Yields the wait before each further attempt, ending once the attempt
/// budget is spent.
struct Backoff<'a> {
    config: &'a RetryConfig,
    attempt: usize,
    next: Duration,
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.config.max_attempts.is_some_and(|max| self.attempt >= max) {
            return None;
        }
        let delay = self.next;
        self.next = delay.mul_f64(self.config.multiplier).min(self.config.max_delay);
        Some(delay)
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects the error, or
/// the attempts run out. The last error is returned unchanged.
pub async fn retry_if<F, Fut, T, E, P>(
    operation_name: &str,
    config: &RetryConfig,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut backoff = config.backoff();
    let mut failures = 0usize;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if failures > 0 {
                    info!(operation = operation_name, failures, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };
        failures += 1;

        if !should_retry(&err) {
            return Err(err);
        }
        let Some(delay) = backoff.next() else {
            return Err(err);
        };

        warn!(
            operation = operation_name,
            attempt = failures,
            max_attempts = ?config.max_attempts,
            error = %err,
            ?delay,
            "Attempt failed, backing off"
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts: Some(max_attempts),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    /// Fails with `"transient"` until call `succeed_on`, or forever when
    /// `succeed_on` is zero.
    async fn flaky(calls: &AtomicUsize, succeed_on: usize) -> Result<u32, String> {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if succeed_on != 0 && call >= succeed_on {
            Ok(7)
        } else {
            Err(format!("transient {}", call))
        }
    }

    #[tokio::test]
    async fn test_first_success_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let result = retry_if("op", &fast(3), |_| true, || flaky(&calls, 1)).await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let calls = AtomicUsize::new(0);
        let result = retry_if("op", &fast(3), |_| true, || flaky(&calls, 3)).await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_with_last_error() {
        let calls = AtomicUsize::new(0);
        let result = retry_if("op", &fast(4), |_| true, || flaky(&calls, 0)).await;

        assert_eq!(result, Err("transient 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_early() {
        let calls = AtomicUsize::new(0);
        let result = retry_if("op", &fast(5), |e: &String| !e.ends_with('1'), || flaky(&calls, 0)).await;

        assert_eq!(result, Err("transient 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_never_waits() {
        let calls = AtomicUsize::new(0);
        let result = retry_if("op", &fast(1), |_| true, || flaky(&calls, 2)).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: Some(5),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            multiplier: 2.0,
        };
        let delays: Vec<_> = config.backoff().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 300, 300]);
    }

    #[test]
    fn test_unbounded_backoff_keeps_yielding() {
        let config = RetryConfig::publisher();
        let delays: Vec<_> = config.backoff().take(12).collect();
        assert_eq!(delays.len(), 12);
        assert_eq!(delays[11], Duration::from_secs(300));
        assert_eq!(RetryConfig::default(), RetryConfig::interactive());
    }
}
