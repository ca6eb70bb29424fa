//! Suite runner: one isolated session per scenario, bounded parallelism.

use crate::config::SuiteConfig;
use crate::driver::SessionFactory;
use crate::result::{E2eError, E2eResult};
use crate::scenario::{Scenario, StepFailure, StepRecord};
use crate::session::{PageSession, SessionOptions};
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use url::Url;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    /// Failing step index; `None` when no session could be opened
    pub step_index: Option<usize>,
    /// Rendered failing step
    pub step: Option<String>,
    /// Error kind, e.g. `assertion`
    pub kind: &'static str,
    /// Error message
    pub message: String,
}

impl FailureDetail {
    fn from_step(failure: &StepFailure) -> Self {
        Self {
            step_index: Some(failure.step_index),
            step: Some(failure.step.clone()),
            kind: failure.error.kind(),
            message: failure.error.to_string(),
        }
    }

    fn from_setup(error: &E2eError) -> Self {
        Self {
            step_index: None,
            step: None,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Whether every step passed
    pub passed: bool,
    /// Steps that passed
    pub steps: Vec<StepRecord>,
    /// Set when the scenario failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    /// Wall time including session setup and teardown
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// Aggregated suite results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Outcomes in declaration order
    pub outcomes: Vec<ScenarioOutcome>,
    /// Total duration
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl SuiteReport {
    /// Get number of passed scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// Get number of failed scenarios
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }

    /// Get total number of scenarios run
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// At least one scenario ran and none failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.passed)
    }

    /// Get failed outcomes
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed).collect()
    }

    /// Process exit code: 0 when everything passed
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.all_passed())
    }
}

/// Runs scenarios, each in a fresh session from the factory
#[derive(Debug)]
pub struct SuiteRunner<F> {
    factory: F,
    config: SuiteConfig,
    filter: Option<String>,
}

impl<F: SessionFactory> SuiteRunner<F> {
    /// Create a runner
    #[must_use]
    pub const fn new(factory: F, config: SuiteConfig) -> Self {
        Self {
            factory,
            config,
            filter: None,
        }
    }

    /// Only run scenarios whose name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The session factory
    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// Consume the runner, returning its factory
    #[must_use]
    pub fn into_factory(self) -> F {
        self.factory
    }

    /// Scenarios the filter selects, in declaration order
    #[must_use]
    pub fn select<'a>(&self, scenarios: &'a [Scenario]) -> Vec<&'a Scenario> {
        scenarios
            .iter()
            .filter(|s| self.filter.as_deref().map_or(true, |f| s.name.contains(f)))
            .collect()
    }

    /// Run the selected scenarios.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before anything runs; scenario
    /// failures are reported in the [`SuiteReport`]
    pub async fn run(&self, scenarios: &[Scenario]) -> E2eResult<SuiteReport> {
        self.run_with(scenarios, |_| {}).await
    }

    /// Run the selected scenarios, calling `on_complete` as each finishes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before anything runs
    pub async fn run_with(
        &self,
        scenarios: &[Scenario],
        mut on_complete: impl FnMut(&ScenarioOutcome),
    ) -> E2eResult<SuiteReport> {
        self.config.validate()?;
        for scenario in scenarios {
            scenario.validate()?;
        }
        let base = self.config.base()?;
        let options = SessionOptions::from(&self.config);
        let selected = self.select(scenarios);
        let jobs = self.config.effective_jobs().max(1);
        tracing::info!(
            scenarios = selected.len(),
            jobs,
            base_url = %base,
            "running suite"
        );

        let start = Instant::now();
        let base = &base;
        let mut pending = std::pin::pin!(stream::iter(selected.into_iter().enumerate())
            .map(|(index, scenario)| async move {
                (index, self.run_one(scenario, base, options).await)
            })
            .buffer_unordered(jobs));

        let mut finished = Vec::new();
        while let Some((index, outcome)) = pending.next().await {
            on_complete(&outcome);
            finished.push((index, outcome));
        }
        finished.sort_by_key(|(index, _)| *index);

        let report = SuiteReport {
            outcomes: finished.into_iter().map(|(_, o)| o).collect(),
            duration: start.elapsed(),
        };
        tracing::info!(
            passed = report.passed(),
            failed = report.failed(),
            duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            "suite finished"
        );
        Ok(report)
    }

    async fn run_one(
        &self,
        scenario: &Scenario,
        base: &Url,
        options: SessionOptions,
    ) -> ScenarioOutcome {
        let start = Instant::now();
        let driver = match self.factory.open().await {
            Ok(driver) => driver,
            Err(error) => {
                tracing::error!(scenario = %scenario.name, %error, "could not open session");
                return ScenarioOutcome {
                    name: scenario.name.clone(),
                    passed: false,
                    steps: Vec::new(),
                    failure: Some(FailureDetail::from_setup(&error)),
                    duration: start.elapsed(),
                };
            }
        };

        let mut session = PageSession::new(driver, options);
        let result = scenario.run(&mut session, base).await;
        if let Err(error) = session.close().await {
            tracing::warn!(scenario = %scenario.name, %error, "failed to close session");
        }

        match result {
            Ok(report) => ScenarioOutcome {
                name: report.name,
                passed: true,
                steps: report.steps,
                failure: None,
                duration: start.elapsed(),
            },
            Err(failure) => ScenarioOutcome {
                failure: Some(FailureDetail::from_step(&failure)),
                name: failure.scenario,
                passed: false,
                steps: failure.completed,
                duration: start.elapsed(),
            },
        }
    }
}
