//! Scenarios: named, ordered step lists run against one page session.
//!
//! Scenarios are built in code or loaded from YAML:
//!
//! ```yaml
//! name: homepage has title and heading
//! steps:
//!   - action: navigate
//!     url: /
//!   - action: expect_title
//!     expected: Welcome to Leptos
//!   - action: expect_text
//!     locator: { css: h1, nth: 0 }
//!     expected: Welcome to Leptos!
//!   - action: click
//!     locator: { css: button, nth: 0 }
//! ```
//!
//! A file holds either one scenario or a list of them. `expected` is a bare
//! string for exact text or `{ pattern: "..." }` for a regular expression.

use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::matcher::TextMatcher;
use crate::result::{E2eError, E2eResult};
use crate::session::PageSession;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Instrument;
use url::Url;

/// One action or expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL, relative ones resolved against the base URL
    Navigate {
        /// Target URL
        url: String,
    },
    /// Wait for the document title
    ExpectTitle {
        /// Expected title
        expected: TextMatcher,
    },
    /// Wait for an element's text
    ExpectText {
        /// Element to read
        locator: Locator,
        /// Expected text
        expected: TextMatcher,
    },
    /// Click an element once it is actionable
    Click {
        /// Element to click
        locator: Locator,
    },
}

impl Step {
    async fn execute<D: PageDriver>(
        &self,
        session: &mut PageSession<D>,
        base: &Url,
    ) -> E2eResult<()> {
        match self {
            Self::Navigate { url } => {
                let target = base
                    .join(url)
                    .map_err(|e| E2eError::config(format!("cannot resolve '{url}': {e}")))?;
                session.navigate(target.as_str()).await
            }
            Self::ExpectTitle { expected } => session.assert_title(expected.clone()).await,
            Self::ExpectText { locator, expected } => {
                session.assert_text(locator, expected.clone()).await
            }
            Self::Click { locator } => session.click(locator).await,
        }
    }

    const fn needs_page(&self) -> bool {
        !matches!(self, Self::Navigate { .. })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate to {url}"),
            Self::ExpectTitle { expected } => write!(f, "expect title {expected}"),
            Self::ExpectText { locator, expected } => {
                write!(f, "expect {locator} to have text {expected}")
            }
            Self::Click { locator } => write!(f, "click {locator}"),
        }
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// A step that completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Position in the scenario
    pub index: usize,
    /// Rendered step
    pub description: String,
    /// Time spent
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// A scenario whose steps all passed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Completed steps
    pub steps: Vec<StepRecord>,
    /// Total time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// The first step that failed; later steps did not run
#[derive(Debug, Error)]
#[error("step {} ({step}) failed: {error}", .step_index + 1)]
pub struct StepFailure {
    /// Scenario name
    pub scenario: String,
    /// Index of the failing step
    pub step_index: usize,
    /// Rendered failing step
    pub step: String,
    /// Steps that passed before it
    pub completed: Vec<StepRecord>,
    /// Why it failed
    #[source]
    pub error: E2eError,
    /// Time until the failure
    pub duration: Duration,
}

/// A named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a navigation
    #[must_use]
    pub fn navigate(self, url: impl Into<String>) -> Self {
        self.step(Step::Navigate { url: url.into() })
    }

    /// Append a title expectation
    #[must_use]
    pub fn expect_title(self, expected: impl Into<TextMatcher>) -> Self {
        self.step(Step::ExpectTitle {
            expected: expected.into(),
        })
    }

    /// Append a text expectation
    #[must_use]
    pub fn expect_text(self, locator: Locator, expected: impl Into<TextMatcher>) -> Self {
        self.step(Step::ExpectText {
            locator,
            expected: expected.into(),
        })
    }

    /// Append a click
    #[must_use]
    pub fn click(self, locator: Locator) -> Self {
        self.step(Step::Click { locator })
    }

    /// Check the scenario is runnable.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Scenario`] for an empty name, no steps, or a
    /// step that needs a page before the first navigation
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(scenario_error("scenario name must not be empty"));
        }
        match self.steps.first() {
            None => Err(scenario_error(format!(
                "scenario '{}' has no steps",
                self.name
            ))),
            Some(step) if step.needs_page() => Err(scenario_error(format!(
                "scenario '{}' must navigate before '{step}'",
                self.name
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Run every step in order on `session`, stopping at the first failure.
    ///
    /// Relative navigation targets are resolved against `base`. The session
    /// is left open; closing it is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns the failing step with its error
    pub async fn run<D: PageDriver>(
        &self,
        session: &mut PageSession<D>,
        base: &Url,
    ) -> Result<ScenarioReport, StepFailure> {
        let span = tracing::info_span!("scenario", name = %self.name);
        self.run_steps(session, base).instrument(span).await
    }

    async fn run_steps<D: PageDriver>(
        &self,
        session: &mut PageSession<D>,
        base: &Url,
    ) -> Result<ScenarioReport, StepFailure> {
        let start = Instant::now();
        let mut completed = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let step_start = Instant::now();
            if let Err(error) = step.execute(session, base).await {
                tracing::warn!(step = index + 1, %step, %error, "step failed");
                return Err(StepFailure {
                    scenario: self.name.clone(),
                    step_index: index,
                    step: step.to_string(),
                    completed,
                    error,
                    duration: start.elapsed(),
                });
            }
            tracing::debug!(step = index + 1, %step, "step passed");
            completed.push(StepRecord {
                index,
                description: step.to_string(),
                duration: step_start.elapsed(),
            });
        }

        Ok(ScenarioReport {
            name: self.name.clone(),
            steps: completed,
            duration: start.elapsed(),
        })
    }

    /// Parse one scenario or a list of scenarios from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Scenario`] for malformed YAML, invalid scenarios
    /// or duplicate names
    pub fn from_yaml(source: &str) -> E2eResult<Vec<Self>> {
        let value: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(source).map_err(|e| scenario_error(e.to_string()))?;
        let scenarios = if value.is_sequence() {
            serde_yaml_ng::from_value::<Vec<Self>>(value)
        } else {
            serde_yaml_ng::from_value::<Self>(value).map(|s| vec![s])
        }
        .map_err(|e| scenario_error(e.to_string()))?;

        let mut seen = HashSet::new();
        for scenario in &scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(scenario_error(format!(
                    "duplicate scenario name '{}'",
                    scenario.name
                )));
            }
        }
        Ok(scenarios)
    }
}

fn scenario_error(message: impl Into<String>) -> E2eError {
    E2eError::Scenario {
        message: message.into(),
    }
}

/// Load scenarios from a YAML file.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_scenarios(path: &Path) -> E2eResult<Vec<Scenario>> {
    let source = std::fs::read_to_string(path)?;
    Scenario::from_yaml(&source).map_err(|e| match e {
        E2eError::Scenario { message } => {
            scenario_error(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDocument, MockDriver, MockSite};
    use crate::session::SessionOptions;
    use crate::suite;
    use crate::wait::{LoadState, WaitOptions};

    const ROOT: &str = "http://localhost:3000/";

    fn session() -> PageSession<MockDriver> {
        let site = MockSite::new().with_page(ROOT, MockDocument::leptos_starter());
        let wait = WaitOptions::new().with_timeout(100).with_poll_interval(10);
        PageSession::new(
            MockDriver::new(site),
            SessionOptions {
                navigation_timeout_ms: 1_000,
                load_state: LoadState::Load,
                expect: wait,
                action: wait,
            },
        )
    }

    fn base() -> Url {
        Url::parse(ROOT).unwrap()
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_homepage_passes() {
            let mut session = session();
            let report = suite::homepage_scenario()
                .run(&mut session, &base())
                .await
                .unwrap();
            assert_eq!(report.name, suite::HOMEPAGE_SCENARIO);
            assert_eq!(report.steps.len(), 3);
        }

        #[tokio::test]
        async fn test_counter_passes() {
            let mut session = session();
            let report = suite::counter_scenario()
                .unwrap()
                .run(&mut session, &base())
                .await
                .unwrap();
            assert_eq!(report.steps.len(), 6);
            assert_eq!(
                session
                    .driver()
                    .history()
                    .iter()
                    .filter(|c| c.starts_with("click"))
                    .count(),
                2
            );
        }

        #[tokio::test]
        async fn test_stops_at_first_failure() {
            let mut session = session();
            let scenario = Scenario::new("wrong title")
                .navigate("/")
                .expect_title("Welcome to Axum")
                .click(Locator::new("button").first());
            let failure = scenario.run(&mut session, &base()).await.unwrap_err();
            assert_eq!(failure.step_index, 1);
            assert_eq!(failure.completed.len(), 1);
            assert!(matches!(failure.error, E2eError::Assertion { .. }));
            assert!(!session.driver().was_called("click"));
        }

        #[tokio::test]
        async fn test_navigation_failure() {
            let mut session = session();
            let scenario = Scenario::new("elsewhere")
                .navigate("http://localhost:9/")
                .expect_title(suite::EXPECTED_TITLE);
            let failure = scenario.run(&mut session, &base()).await.unwrap_err();
            assert_eq!(failure.step_index, 0);
            assert!(matches!(failure.error, E2eError::Navigation { .. }));
            assert!(failure.to_string().starts_with("step 1 (navigate to"));
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_builtins_valid() {
            for scenario in suite::default_suite().unwrap() {
                scenario.validate().unwrap();
            }
        }

        #[test]
        fn test_empty_rejected() {
            assert!(Scenario::new("empty").validate().is_err());
            assert!(Scenario::new(" ").navigate("/").validate().is_err());
        }

        #[test]
        fn test_must_navigate_first() {
            let err = Scenario::new("x")
                .click(Locator::new("button"))
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains("must navigate before"));
        }
    }

    mod yaml_tests {
        use super::*;

        const COUNTER_YAML: &str = r"
name: counter
steps:
  - action: navigate
    url: /
  - action: expect_text
    locator: { css: button, nth: 0 }
    expected: { pattern: 'Click Me: \s*0' }
  - action: click
    locator: { css: button, nth: 0 }
  - action: expect_text
    locator: { css: button, nth: 0 }
    expected: { pattern: 'Click Me: \s*1' }
";

        #[test]
        fn test_single_scenario() {
            let scenarios = Scenario::from_yaml(COUNTER_YAML).unwrap();
            assert_eq!(scenarios.len(), 1);
            let scenario = &scenarios[0];
            assert_eq!(scenario.steps.len(), 4);
            assert_eq!(
                scenario.steps[2],
                Step::Click {
                    locator: Locator::new("button").first().with_strict(true)
                }
            );
        }

        #[tokio::test]
        async fn test_loaded_scenario_runs() {
            let scenario = Scenario::from_yaml(COUNTER_YAML).unwrap().remove(0);
            let mut session = session();
            scenario.run(&mut session, &base()).await.unwrap();
        }

        #[test]
        fn test_list_of_scenarios() {
            let yaml = "
- name: a
  steps:
    - action: navigate
      url: /
- name: b
  steps:
    - action: navigate
      url: /about
    - action: expect_title
      expected: About
";
            let scenarios = Scenario::from_yaml(yaml).unwrap();
            assert_eq!(scenarios.len(), 2);
            assert_eq!(
                scenarios[1].steps[1],
                Step::ExpectTitle {
                    expected: TextMatcher::exact("About")
                }
            );
        }

        #[test]
        fn test_duplicate_names_rejected() {
            let yaml = "
- name: a
  steps: [{ action: navigate, url: / }]
- name: a
  steps: [{ action: navigate, url: / }]
";
            let err = Scenario::from_yaml(yaml).unwrap_err();
            assert!(err.to_string().contains("duplicate scenario name"));
        }

        #[test]
        fn test_unknown_action_rejected() {
            let yaml = "name: a\nsteps:\n  - action: hover\n    locator: { css: a }\n";
            assert!(matches!(
                Scenario::from_yaml(yaml),
                Err(E2eError::Scenario { .. })
            ));
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("counter.yaml");
            std::fs::write(&path, COUNTER_YAML).unwrap();
            assert_eq!(load_scenarios(&path).unwrap().len(), 1);
        }

        #[test]
        fn test_load_error_names_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bad.yaml");
            std::fs::write(&path, "name: a\nsteps: []\n").unwrap();
            let err = load_scenarios(&path).unwrap_err();
            assert!(err.to_string().contains("bad.yaml"));
        }

        #[test]
        fn test_missing_file_is_io() {
            let err = load_scenarios(Path::new("/nonexistent/scenarios.yaml")).unwrap_err();
            assert!(matches!(err, E2eError::Io(_)));
        }
    }
}
