//! Page sessions: navigation, auto-waiting expectations and clicks over a
//! [`PageDriver`].
//!
//! A session is valid from its first successful navigation until it is
//! closed. Expectations and clicks re-resolve their locator on every poll.

use crate::config::SuiteConfig;
use crate::driver::PageDriver;
use crate::locator::{Locator, Resolution};
use crate::matcher::TextMatcher;
use crate::result::{E2eError, E2eResult};
use crate::wait::{poll_until, LoadState, Poll, PollOutcome, WaitOptions};
use std::time::{Duration, Instant};

/// Lifecycle of a [`PageSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Opened, nothing loaded yet
    Blank,
    /// A document is loaded
    Loaded {
        /// URL that was navigated to
        url: String,
    },
    /// Closed; every operation fails
    Closed,
}

/// Budgets a session applies to its operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Budget for `navigate`
    pub navigation_timeout_ms: u64,
    /// Readiness navigation waits for
    pub load_state: LoadState,
    /// Budget for expectations
    pub expect: WaitOptions,
    /// Budget for clicks to find an actionable element
    pub action: WaitOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SuiteConfig::default())
    }
}

impl From<&SuiteConfig> for SessionOptions {
    fn from(config: &SuiteConfig) -> Self {
        Self {
            navigation_timeout_ms: config.navigation_timeout_ms,
            load_state: config.load_state,
            expect: config.expect_wait(),
            action: config.action_wait(),
        }
    }
}

/// An isolated page owned by one scenario
#[derive(Debug)]
pub struct PageSession<D: PageDriver> {
    driver: D,
    options: SessionOptions,
    state: SessionState,
}

impl<D: PageDriver> PageSession<D> {
    /// Wrap a freshly opened driver
    #[must_use]
    pub const fn new(driver: D, options: SessionOptions) -> Self {
        Self {
            driver,
            options,
            state: SessionState::Blank,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Budgets in effect
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    fn require_open(&self) -> E2eResult<()> {
        if self.state == SessionState::Closed {
            return Err(E2eError::invalid_state("page session is closed"));
        }
        Ok(())
    }

    fn require_loaded(&self) -> E2eResult<()> {
        match self.state {
            SessionState::Loaded { .. } => Ok(()),
            SessionState::Blank => Err(E2eError::invalid_state(
                "page session has not navigated anywhere yet",
            )),
            SessionState::Closed => Err(E2eError::invalid_state("page session is closed")),
        }
    }

    fn wait_for(locator: &Locator, base: WaitOptions) -> WaitOptions {
        locator
            .options()
            .timeout_ms
            .map_or(base, |ms| base.with_timeout(ms))
    }

    /// Load `url` and wait for the configured load state.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Navigation`] on network failure or timeout
    pub async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        self.require_open()?;
        tracing::debug!(url, load_state = %self.options.load_state, "navigate");
        let result = self
            .driver
            .navigate(
                url,
                self.options.load_state,
                Duration::from_millis(self.options.navigation_timeout_ms),
            )
            .await;
        if let Err(error) = result {
            // The previous document is gone or stale either way.
            self.state = SessionState::Blank;
            return Err(error);
        }
        self.state = SessionState::Loaded {
            url: url.to_string(),
        };
        Ok(())
    }

    /// Poll `document.title` until it matches `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Assertion`] with the last seen title on timeout
    pub async fn assert_title(&self, expected: impl Into<TextMatcher>) -> E2eResult<()> {
        self.require_loaded()?;
        let expected = expected.into();
        let wait = self.options.expect;
        let driver = &self.driver;
        let matcher = &expected;

        let outcome = poll_until(&wait, || async move {
            let title = driver.title().await?;
            Ok(if matcher.matches(&title) {
                Poll::Ready(())
            } else {
                Poll::Pending(format!("{title:?}"))
            })
        })
        .await?;

        match outcome {
            PollOutcome::Ready { attempts, .. } => {
                tracing::debug!(%expected, attempts, "title matched");
                Ok(())
            }
            PollOutcome::TimedOut(timeout) => Err(E2eError::Assertion {
                description: "page title".to_string(),
                expected: expected.to_string(),
                last_observed: timeout.last_observed,
                timeout_ms: wait.timeout_ms,
            }),
        }
    }

    /// Poll the located element's text until it matches `expected`.
    ///
    /// A missing element or a strict-mode violation counts as a
    /// non-matching observation and keeps polling.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Assertion`] with the last observation on timeout
    pub async fn assert_text(
        &self,
        locator: &Locator,
        expected: impl Into<TextMatcher>,
    ) -> E2eResult<()> {
        self.require_loaded()?;
        let expected = expected.into();
        let wait = Self::wait_for(locator, self.options.expect);
        let driver = &self.driver;
        let matcher = &expected;

        let outcome = poll_until(&wait, || async move {
            let matches = driver.query(locator.selector()).await?;
            Ok(match locator.resolve(&matches) {
                Resolution::Found { element, .. } if matcher.matches(&element.text_content) => {
                    Poll::Ready(())
                }
                other => Poll::Pending(other.describe()),
            })
        })
        .await?;

        match outcome {
            PollOutcome::Ready { attempts, .. } => {
                tracing::debug!(%locator, %expected, attempts, "text matched");
                Ok(())
            }
            PollOutcome::TimedOut(timeout) => Err(E2eError::Assertion {
                description: format!("text of {locator}"),
                expected: expected.to_string(),
                last_observed: timeout.last_observed,
                timeout_ms: wait.timeout_ms,
            }),
        }
    }

    /// Wait until the located element is visible and enabled, then click it.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Interaction`] if the element never becomes
    /// actionable or the click cannot be dispatched
    pub async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        self.require_loaded()?;
        let wait = Self::wait_for(locator, self.options.action);
        let driver = &self.driver;
        let start = Instant::now();

        let outcome = poll_until(&wait, || async move {
            let matches = driver.query(locator.selector()).await?;
            Ok(match locator.resolve(&matches) {
                Resolution::Found { index, element } if element.is_actionable() => {
                    Poll::Ready(index)
                }
                Resolution::Found { element, .. } if !element.visible => {
                    Poll::Pending("element is not visible".to_string())
                }
                Resolution::Found { .. } => Poll::Pending("element is disabled".to_string()),
                other => Poll::Pending(other.describe()),
            })
        })
        .await?;

        let index = match outcome {
            PollOutcome::Ready { value, .. } => value,
            PollOutcome::TimedOut(timeout) => {
                return Err(E2eError::Interaction {
                    locator: locator.to_string(),
                    reason: timeout.last_observed,
                    timeout_ms: wait.timeout_ms,
                })
            }
        };

        tracing::debug!(%locator, index, "click");
        let remaining = wait.timeout().saturating_sub(start.elapsed());
        let interaction = |reason: String| E2eError::Interaction {
            locator: locator.to_string(),
            reason,
            timeout_ms: wait.timeout_ms,
        };
        match tokio::time::timeout(remaining, self.driver.click(locator.selector(), index)).await {
            Ok(result) => result.map_err(|e| interaction(e.to_string())),
            Err(_) => Err(interaction("click was not dispatched in time".to_string())),
        }
    }

    /// Read the located element's text once, without waiting.
    ///
    /// # Errors
    ///
    /// Returns error if the session is not loaded or the query fails
    pub async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.require_loaded()?;
        let matches = self.driver.query(locator.selector()).await?;
        Ok(match locator.resolve(&matches) {
            Resolution::Found { element, .. } => Some(element.text_content.clone()),
            _ => None,
        })
    }

    /// Number of elements the locator's selector matches right now.
    ///
    /// # Errors
    ///
    /// Returns error if the session is not loaded or the query fails
    pub async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.require_loaded()?;
        Ok(self.driver.query(locator.selector()).await?.len())
    }

    /// Close the page. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails to release the page
    pub async fn close(&mut self) -> E2eResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.driver.close().await
    }
}
