//! Wait mechanisms: load states and the poll-until-timeout loop behind
//! every expectation and interaction.
//!
//! A check is evaluated immediately, then every `poll_interval` until it
//! reports [`Poll::Ready`] or the budget elapses. The budget is the only
//! place a scenario suspends.

use crate::result::{E2eError, E2eResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Default timeout for expectations and actions (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default timeout for navigation (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Network idle threshold (500ms without new requests)
#[cfg(feature = "browser")]
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    #[serde(rename = "load")]
    Load,
    /// Wait for `DOMContentLoaded` event
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// Wait for `load`, then for no new requests for 500ms
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl LoadState {
    /// Get the name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// JavaScript predicate that holds once the document reached this state
    #[must_use]
    pub const fn ready_script(&self) -> &'static str {
        match self {
            Self::DomContentLoaded => "document.readyState !== 'loading'",
            Self::Load | Self::NetworkIdle => "document.readyState === 'complete'",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

impl FromStr for LoadState {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "load" => Ok(Self::Load),
            "domcontentloaded" => Ok(Self::DomContentLoaded),
            "networkidle" => Ok(Self::NetworkIdle),
            other => Err(E2eError::config(format!(
                "unknown load state '{other}' (expected load, domcontentloaded or networkidle)"
            ))),
        }
    }
}

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// Condition holds
    Ready(T),
    /// Condition does not hold yet; carries what was observed
    Pending(String),
}

/// The budget elapsed before the condition held
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTimeout {
    /// Observation from the final check
    pub last_observed: String,
    /// Number of checks performed
    pub attempts: usize,
    /// Time spent polling
    pub elapsed: Duration,
}

/// Outcome of [`poll_until`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The check became ready
    Ready {
        /// Value produced by the ready check
        value: T,
        /// Number of checks performed
        attempts: usize,
    },
    /// The budget elapsed
    TimedOut(WaitTimeout),
}

/// Observation reported when the budget elapses before any check finished
pub const NO_OBSERVATION: &str = "no check completed within the timeout";

/// Run `check` until it is ready or `options.timeout` elapses.
///
/// Each check runs under the remaining budget; a check still in flight
/// when the budget elapses is dropped and the wait times out with the
/// previous observation. Errors returned by `check` abort the wait
/// immediately; they are driver failures, not observations.
pub async fn poll_until<T, F, Fut>(options: &WaitOptions, mut check: F) -> E2eResult<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Poll<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0;
    let mut last_observed: Option<String> = None;

    loop {
        attempts += 1;
        let remaining = timeout.saturating_sub(start.elapsed());
        match tokio::time::timeout(remaining, check()).await {
            Ok(result) => match result? {
                Poll::Ready(value) => return Ok(PollOutcome::Ready { value, attempts }),
                Poll::Pending(observed) => last_observed = Some(observed),
            },
            Err(_) => {
                tracing::debug!(attempts, "check still pending when the wait budget elapsed");
                return Ok(timed_out(last_observed, attempts, start.elapsed()));
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(timed_out(last_observed, attempts, elapsed));
        }

        tokio::time::sleep(options.poll_interval().min(timeout - elapsed)).await;
    }
}

fn timed_out<T>(last_observed: Option<String>, attempts: usize, elapsed: Duration) -> PollOutcome<T> {
    let last_observed = last_observed.unwrap_or_else(|| NO_OBSERVATION.to_string());
    tracing::debug!(attempts, ?elapsed, %last_observed, "wait budget elapsed");
    PollOutcome::TimedOut(WaitTimeout {
        last_observed,
        attempts,
        elapsed,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod load_state_tests {
        use super::*;

        #[test]
        fn test_default_is_load() {
            assert_eq!(LoadState::default(), LoadState::Load);
        }

        #[test]
        fn test_parse() {
            assert_eq!("load".parse::<LoadState>().unwrap(), LoadState::Load);
            assert_eq!(
                "DOMContentLoaded".parse::<LoadState>().unwrap(),
                LoadState::DomContentLoaded
            );
            assert_eq!(
                "networkidle".parse::<LoadState>().unwrap(),
                LoadState::NetworkIdle
            );
            assert!("idle".parse::<LoadState>().is_err());
        }

        #[test]
        fn test_display_matches_serde() {
            let json = serde_json::to_string(&LoadState::DomContentLoaded).unwrap();
            assert_eq!(json, format!("\"{}\"", LoadState::DomContentLoaded));
        }

        #[test]
        fn test_ready_scripts() {
            assert!(LoadState::Load.ready_script().contains("complete"));
            assert!(LoadState::DomContentLoaded
                .ready_script()
                .contains("loading"));
        }
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_builder() {
            let opts = WaitOptions::new().with_timeout(250).with_poll_interval(10);
            assert_eq!(opts.timeout(), Duration::from_millis(250));
            assert_eq!(opts.poll_interval(), Duration::from_millis(10));
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test]
        async fn test_ready_immediately() {
            let opts = WaitOptions::new().with_timeout(100).with_poll_interval(10);
            let outcome = poll_until(&opts, || async { Ok(Poll::Ready(7)) })
                .await
                .unwrap();
            assert_eq!(outcome, PollOutcome::Ready { value: 7, attempts: 1 });
        }

        #[tokio::test]
        async fn test_ready_after_retries() {
            let calls = AtomicUsize::new(0);
            let opts = WaitOptions::new().with_timeout(2_000).with_poll_interval(5);
            let outcome = poll_until(&opts, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n >= 3 {
                        Ok(Poll::Ready(n))
                    } else {
                        Ok(Poll::Pending(format!("attempt {n}")))
                    }
                }
            })
            .await
            .unwrap();
            assert_eq!(outcome, PollOutcome::Ready { value: 3, attempts: 4 });
        }

        #[tokio::test]
        async fn test_times_out_with_last_observation() {
            let calls = AtomicUsize::new(0);
            let opts = WaitOptions::new().with_timeout(40).with_poll_interval(5);
            let outcome = poll_until::<(), _, _>(&opts, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(Poll::Pending(format!("seen {n}"))) }
            })
            .await
            .unwrap();
            match outcome {
                PollOutcome::TimedOut(timeout) => {
                    assert!(timeout.attempts >= 2);
                    assert!(timeout.elapsed >= Duration::from_millis(40));
                    assert_eq!(
                        timeout.last_observed,
                        format!("seen {}", timeout.attempts - 1)
                    );
                }
                PollOutcome::Ready { .. } => panic!("expected timeout"),
            }
        }

        #[tokio::test]
        async fn test_slow_check_is_cut_off_at_budget() {
            let calls = AtomicUsize::new(0);
            let opts = WaitOptions::new().with_timeout(100).with_poll_interval(5);
            let start = Instant::now();
            let outcome = poll_until::<(), _, _>(&opts, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n > 0 {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok(Poll::Pending(format!("seen {n}")))
                }
            })
            .await
            .unwrap();
            assert!(start.elapsed() < Duration::from_secs(2));
            match outcome {
                PollOutcome::TimedOut(timeout) => {
                    assert_eq!(timeout.attempts, 2);
                    assert_eq!(timeout.last_observed, "seen 0");
                }
                PollOutcome::Ready { .. } => panic!("expected timeout"),
            }
        }

        #[tokio::test]
        async fn test_first_check_never_finishes() {
            let opts = WaitOptions::new().with_timeout(50).with_poll_interval(5);
            let outcome = poll_until::<(), _, _>(&opts, || async {
                std::future::pending::<()>().await;
                Ok(Poll::Pending(String::new()))
            })
            .await
            .unwrap();
            match outcome {
                PollOutcome::TimedOut(timeout) => {
                    assert_eq!(timeout.last_observed, NO_OBSERVATION);
                    assert_eq!(timeout.attempts, 1);
                }
                PollOutcome::Ready { .. } => panic!("expected timeout"),
            }
        }

        #[tokio::test]
        async fn test_check_error_aborts() {
            let opts = WaitOptions::new().with_timeout(1_000).with_poll_interval(5);
            let result = poll_until::<(), _, _>(&opts, || async {
                Err(E2eError::Evaluation {
                    message: "target closed".to_string(),
                })
            })
            .await;
            assert!(matches!(result, Err(E2eError::Evaluation { .. })));
        }

        #[tokio::test]
        async fn test_zero_timeout_checks_once() {
            let opts = WaitOptions::new().with_timeout(0);
            let outcome = poll_until::<(), _, _>(&opts, || async {
                Ok(Poll::Pending("never".to_string()))
            })
            .await
            .unwrap();
            assert!(matches!(
                outcome,
                PollOutcome::TimedOut(WaitTimeout { attempts: 1, .. })
            ));
        }
    }
}
