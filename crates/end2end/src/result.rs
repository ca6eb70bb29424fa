//! Result and error types for end2end.

use thiserror::Error;

/// Result type for end2end operations
pub type E2eResult<T> = Result<T, E2eError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum E2eError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page could not be created or closed
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// The page failed to load within the navigation budget
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// An expectation never held within the wait budget
    #[error("{description}: expected {expected}, last observed {last_observed} (timeout {timeout_ms}ms)")]
    Assertion {
        /// What was being checked, e.g. `text of locator("h1")`
        description: String,
        /// Rendered expectation
        expected: String,
        /// Last value seen while polling
        last_observed: String,
        /// Budget that elapsed
        timeout_ms: u64,
    },

    /// The target element never became actionable
    #[error("Cannot interact with {locator}: {reason} (timeout {timeout_ms}ms)")]
    Interaction {
        /// Locator description
        locator: String,
        /// Last reason the element was not actionable
        reason: String,
        /// Budget that elapsed
        timeout_ms: u64,
    },

    /// Script evaluation in the page failed
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Operation called in the wrong session state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario definition could not be parsed
    #[error("Scenario error: {message}")]
    Scenario {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl E2eError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error is one of the three scenario-terminal kinds
    /// (navigation, assertion, interaction).
    #[must_use]
    pub const fn is_scenario_failure(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::Assertion { .. } | Self::Interaction { .. }
        )
    }

    /// Short machine-readable name for reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BrowserNotFound | Self::BrowserLaunch { .. } => "browser",
            Self::Page { .. } => "page",
            Self::Navigation { .. } => "navigation",
            Self::Assertion { .. } => "assertion",
            Self::Interaction { .. } => "interaction",
            Self::Evaluation { .. } => "evaluation",
            Self::InvalidState { .. } => "invalid_state",
            Self::Config { .. } => "config",
            Self::Scenario { .. } => "scenario",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}
