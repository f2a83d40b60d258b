//! Bounded-retry polling for eventually consistent state.
//!
//! A write to the control plane and its observable effect on derived
//! objects are separated by an asynchronous reconcile. Every
//! verification that depends on propagation runs its check through
//! [`poll_until`], which retries on "not yet" results and transient
//! errors until the condition holds or the budget runs out.
//!
//! Retries are synchronous on the calling thread; concurrency across
//! verification calls is the caller's concern. Timeout is the only
//! cancellation signal.

use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, VerifyError};

/// Interval/timeout budget for one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait between consecutive checks.
    pub interval: Duration,
    /// Total budget before giving up.
    pub timeout: Duration,
    /// Whether the first check runs before the first wait.
    pub immediate: bool,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration, immediate: bool) -> Self {
        Self {
            interval,
            timeout,
            immediate,
        }
    }
}

/// Invokes `check` until it returns `Ok(true)`, returns a non-transient
/// error, or the budget is exhausted.
///
/// `Ok(false)` means "not yet"; transient errors (not-found while the
/// object is still propagating) are retried the same way. Exhausting
/// the budget yields [`VerifyError::Timeout`] naming `what`.
pub fn poll_until<F>(config: &PollConfig, what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    let start = Instant::now();

    if !config.immediate {
        sleep(config.interval);
    }

    loop {
        match check() {
            Ok(true) => {
                debug!(what, elapsed = ?start.elapsed(), "condition met");
                return Ok(());
            }
            Ok(false) => {
                debug!(what, elapsed = ?start.elapsed(), "condition not yet met");
            }
            Err(err) if err.is_transient() => {
                debug!(what, error = %err, "transient error, retrying");
            }
            Err(err) => return Err(err),
        }

        if start.elapsed() >= config.timeout {
            return Err(VerifyError::Timeout {
                what: what.to_string(),
                elapsed: start.elapsed(),
            });
        }
        sleep(config.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ApiError;

    fn fast() -> PollConfig {
        PollConfig::new(Duration::from_millis(1), Duration::from_millis(250), true)
    }

    #[test]
    fn test_succeeds_immediately() {
        let mut calls = 0;
        let result = poll_until(&fast(), "always true", || {
            calls += 1;
            Ok(true)
        });
        assert!(result.is_ok());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retries_until_done() {
        let mut calls = 0;
        let result = poll_until(&fast(), "third time", || {
            calls += 1;
            Ok(calls >= 3)
        });
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retries_through_transient_errors() {
        let mut calls = 0;
        let result = poll_until(&fast(), "appears later", || {
            calls += 1;
            if calls < 3 {
                Err(ApiError::not_found("clusterrole", "tpl-aggregator").into())
            } else {
                Ok(true)
            }
        });
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_aborts_on_non_transient_error() {
        let mut calls = 0;
        let result = poll_until(&fast(), "backend down", || {
            calls += 1;
            Err(ApiError::Backend("connection refused".into()).into())
        });
        assert!(matches!(result, Err(VerifyError::Api(ApiError::Backend(_)))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_times_out() {
        let config = PollConfig::new(Duration::from_millis(1), Duration::from_millis(10), true);
        let result = poll_until(&config, "never", || Ok(false));
        match result {
            Err(VerifyError::Timeout { what, elapsed }) => {
                assert_eq!(what, "never");
                assert!(elapsed >= config.timeout);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_delayed_first_check() {
        let config = PollConfig::new(Duration::from_millis(5), Duration::from_millis(250), false);
        let start = Instant::now();
        let result = poll_until(&config, "delayed", || Ok(true));
        assert!(result.is_ok());
        assert!(start.elapsed() >= config.interval);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// For any success point within the budget, the poller
            /// stops exactly there: no early exit, no extra checks.
            #[test]
            fn stops_at_the_nth_check(n in 1usize..12) {
                let config =
                    PollConfig::new(Duration::from_millis(1), Duration::from_secs(5), true);
                let mut calls = 0;
                let result = poll_until(&config, "nth check", || {
                    calls += 1;
                    Ok(calls >= n)
                });
                prop_assert!(result.is_ok());
                prop_assert_eq!(calls, n);
            }

            /// Transient errors before the success point never change
            /// the verdict.
            #[test]
            fn transient_errors_are_invisible(n in 1usize..12) {
                let config =
                    PollConfig::new(Duration::from_millis(1), Duration::from_secs(5), true);
                let mut calls = 0;
                let result = poll_until(&config, "after transients", || {
                    calls += 1;
                    if calls < n {
                        Err(ApiError::not_found("clusterrole", "pending").into())
                    } else {
                        Ok(true)
                    }
                });
                prop_assert!(result.is_ok());
                prop_assert_eq!(calls, n);
            }
        }
    }
}
