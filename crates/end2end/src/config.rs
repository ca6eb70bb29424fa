//! Suite configuration: defaults, environment overlay, validation.

use crate::browser::BrowserConfig;
use crate::result::{E2eError, E2eResult};
use crate::wait::{
    LoadState, WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Address the Leptos dev server listens on
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "END2END_BASE_URL";
/// Environment variable naming the Chromium binary
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
/// Environment variable toggling headless mode (`0`/`false` = headed)
pub const ENV_HEADLESS: &str = "END2END_HEADLESS";
/// Environment variable overriding the expect/action timeout
pub const ENV_TIMEOUT_MS: &str = "END2END_TIMEOUT_MS";
/// Environment variable overriding the poll interval
pub const ENV_POLL_INTERVAL_MS: &str = "END2END_POLL_INTERVAL_MS";

/// Configuration shared by every scenario of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Root of the site under test
    pub base_url: String,
    /// Browser launch options
    pub browser: BrowserConfig,
    /// Budget for `navigate`
    pub navigation_timeout_ms: u64,
    /// Budget for text and title expectations
    pub expect_timeout_ms: u64,
    /// Budget for an element to become actionable
    pub action_timeout_ms: u64,
    /// Delay between polls
    pub poll_interval_ms: u64,
    /// Readiness navigation waits for
    pub load_state: LoadState,
    /// Scenarios in flight at once (0 = number of CPUs)
    pub parallel_jobs: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserConfig::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            load_state: LoadState::Load,
            parallel_jobs: 0,
        }
    }
}

fn parse_bool(name: &str, value: &str) -> E2eResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(E2eError::config(format!("{name}: expected a boolean, got '{other}'"))),
    }
}

fn parse_ms(name: &str, value: &str) -> E2eResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| E2eError::config(format!("{name}: expected milliseconds, got '{value}'")))
}

impl SuiteConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set browser options
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Set the expectation and action budgets together.
    ///
    /// A poll interval longer than the new budget is shortened to it.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.expect_timeout_ms = timeout_ms;
        self.action_timeout_ms = timeout_ms;
        if timeout_ms > 0 && self.poll_interval_ms > timeout_ms {
            self.poll_interval_ms = timeout_ms;
        }
        self
    }

    /// Set the navigation budget
    #[must_use]
    pub const fn with_navigation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set the load state navigation waits for
    #[must_use]
    pub const fn with_load_state(mut self, state: LoadState) -> Self {
        self.load_state = state;
        self
    }

    /// Set parallel jobs
    #[must_use]
    pub const fn with_parallel_jobs(mut self, jobs: usize) -> Self {
        self.parallel_jobs = jobs;
        self
    }

    /// Defaults overlaid with `END2END_*` and `CHROMIUM_PATH` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed values
    pub fn from_env() -> E2eResult<Self> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlay values from an arbitrary lookup (used by [`Self::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed values
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> E2eResult<Self> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            self.browser.chromium_path = Some(path);
        }
        if let Some(value) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_bool(ENV_HEADLESS, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            let ms = parse_ms(ENV_TIMEOUT_MS, &value)?;
            self = self.with_timeout_ms(ms);
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms = parse_ms(ENV_POLL_INTERVAL_MS, &value)?;
            self = self.with_poll_interval_ms(ms);
        }
        Ok(self)
    }

    /// Check the configuration before launching anything.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found
    pub fn validate(&self) -> E2eResult<()> {
        self.base()?;
        for (name, value) in [
            ("navigation_timeout_ms", self.navigation_timeout_ms),
            ("expect_timeout_ms", self.expect_timeout_ms),
            ("action_timeout_ms", self.action_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(E2eError::config(format!("{name} must be greater than 0")));
            }
        }
        if self.poll_interval_ms > self.expect_timeout_ms.min(self.action_timeout_ms) {
            return Err(E2eError::config(
                "poll_interval_ms must not exceed the expect and action timeouts",
            ));
        }
        Ok(())
    }

    /// Parsed base URL
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless the base URL is absolute http(s)
    pub fn base(&self) -> E2eResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| E2eError::config(format!("invalid base URL '{}': {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(E2eError::config(format!(
                "base URL must use http or https, got '{scheme}'"
            ))),
        }
    }

    /// Budget for expectations
    #[must_use]
    pub const fn expect_wait(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.expect_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Budget for actions
    #[must_use]
    pub const fn action_wait(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.action_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Get effective number of parallel jobs
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.parallel_jobs == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.parallel_jobs
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = SuiteConfig::default();
            assert_eq!(config.base_url, "http://localhost:3000/");
            assert_eq!(config.expect_timeout_ms, 5_000);
            assert_eq!(config.navigation_timeout_ms, 30_000);
            assert_eq!(config.load_state, LoadState::Load);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_effective_jobs() {
            assert!(SuiteConfig::default().effective_jobs() >= 1);
            assert_eq!(SuiteConfig::default().with_parallel_jobs(3).effective_jobs(), 3);
        }
    }

    mod overlay_tests {
        use super::*;

        #[test]
        fn test_overlay_all() {
            let config = SuiteConfig::default()
                .overlay(env(&[
                    (ENV_BASE_URL, "http://127.0.0.1:8080/"),
                    (ENV_CHROMIUM_PATH, "/opt/chromium"),
                    (ENV_HEADLESS, "false"),
                    (ENV_TIMEOUT_MS, "2500"),
                    (ENV_POLL_INTERVAL_MS, "25"),
                ]))
                .unwrap();
            assert_eq!(config.base_url, "http://127.0.0.1:8080/");
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/opt/chromium"));
            assert!(!config.browser.headless);
            assert_eq!(config.expect_timeout_ms, 2500);
            assert_eq!(config.action_timeout_ms, 2500);
            assert_eq!(config.poll_interval_ms, 25);
        }

        #[test]
        fn test_overlay_nothing() {
            let config = SuiteConfig::default().overlay(env(&[])).unwrap();
            assert_eq!(config, SuiteConfig::default());
        }

        #[test]
        fn test_overlay_bad_bool() {
            let err = SuiteConfig::default()
                .overlay(env(&[(ENV_HEADLESS, "maybe")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_HEADLESS));
        }

        #[test]
        fn test_overlay_bad_timeout() {
            assert!(SuiteConfig::default()
                .overlay(env(&[(ENV_TIMEOUT_MS, "soon")]))
                .is_err());
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_rejects_relative_base() {
            let err = SuiteConfig::default()
                .with_base_url("localhost:3000")
                .validate()
                .unwrap_err();
            assert!(matches!(err, E2eError::Config { .. }));
        }

        #[test]
        fn test_rejects_non_http_scheme() {
            assert!(SuiteConfig::default()
                .with_base_url("file:///tmp/index.html")
                .validate()
                .is_err());
        }

        #[test]
        fn test_rejects_zero_timeout() {
            assert!(SuiteConfig::default().with_timeout_ms(0).validate().is_err());
        }

        #[test]
        fn test_short_timeout_shortens_default_poll() {
            let config = SuiteConfig::default().with_timeout_ms(50);
            assert_eq!(config.poll_interval_ms, 50);
            assert!(config.validate().is_ok());
            assert_eq!(
                SuiteConfig::default().with_timeout_ms(2_000).poll_interval_ms,
                DEFAULT_POLL_INTERVAL_MS
            );
        }

        #[test]
        fn test_short_env_timeout_is_valid() {
            let config = SuiteConfig::default()
                .overlay(env(&[(ENV_TIMEOUT_MS, "50")]))
                .unwrap();
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_rejects_poll_longer_than_timeout() {
            assert!(SuiteConfig::default()
                .with_timeout_ms(50)
                .with_poll_interval_ms(100)
                .validate()
                .is_err());
        }
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_wait_options() {
            let config = SuiteConfig::default()
                .with_timeout_ms(1234)
                .with_poll_interval_ms(10);
            assert_eq!(config.expect_wait().timeout_ms, 1234);
            assert_eq!(config.action_wait().poll_interval_ms, 10);
        }
    }

    #[test]
    fn test_yaml_partial() {
        let config: SuiteConfig =
            serde_yaml_ng::from_str("base_url: http://localhost:8000/\nload_state: networkidle\n")
                .unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/");
        assert_eq!(config.load_state, LoadState::NetworkIdle);
        assert_eq!(config.expect_timeout_ms, 5_000);
    }
}
