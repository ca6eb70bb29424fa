//! Scenario runner wiring: flags over environment over defaults.

use crate::commands::{ListArgs, OutputFormatArg, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_json, ProgressReporter};
use end2end::{
    default_suite, load_scenarios, Scenario, SessionFactory, SuiteConfig, SuiteReport,
    SuiteRunner,
};
use std::path::PathBuf;

/// Build the suite configuration for `run`.
///
/// # Errors
///
/// Returns error if an environment value is malformed or the result is
/// invalid
pub fn build_suite_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    build_suite_config_from(args, |name| std::env::var(name).ok())
}

/// [`build_suite_config`] with an explicit environment lookup.
///
/// # Errors
///
/// Returns error if an environment value is malformed or the result is
/// invalid
pub fn build_suite_config_from(
    args: &RunArgs,
    env: impl Fn(&str) -> Option<String>,
) -> CliResult<SuiteConfig> {
    let mut config = SuiteConfig::default().overlay(env)?;

    if let Some(ref url) = args.base_url {
        config = config.with_base_url(url.clone());
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(ref path) = args.chromium_path {
        config.browser.chromium_path = Some(path.display().to_string());
    }
    if args.no_sandbox {
        config.browser.sandbox = false;
    }
    if let Some(ms) = args.timeout {
        config = config.with_timeout_ms(ms);
    }
    if let Some(ms) = args.poll_interval {
        config = config.with_poll_interval_ms(ms);
    }
    if let Some(ms) = args.navigation_timeout {
        config = config.with_navigation_timeout_ms(ms);
    }
    if let Some(state) = args.wait_until {
        config = config.with_load_state(state);
    }
    config = config.with_parallel_jobs(args.jobs);

    config.validate()?;
    Ok(config)
}

/// Scenarios from the given files, or the built-in suite when there are none.
///
/// # Errors
///
/// Returns error if a file cannot be read or parsed, or names collide
pub fn load_suite(paths: &[PathBuf]) -> CliResult<Vec<Scenario>> {
    if paths.is_empty() {
        return Ok(default_suite()?);
    }
    let mut scenarios: Vec<Scenario> = Vec::new();
    for path in paths {
        for scenario in load_scenarios(path)? {
            if scenarios.iter().any(|s| s.name == scenario.name) {
                return Err(CliError::config(format!(
                    "duplicate scenario name '{}' in {}",
                    scenario.name,
                    path.display()
                )));
            }
            scenarios.push(scenario);
        }
    }
    Ok(scenarios)
}

/// Print the selected scenarios, one per line, to stdout.
///
/// # Errors
///
/// Returns error if scenario files cannot be loaded
pub fn list(args: &ListArgs) -> CliResult<()> {
    let scenarios = load_suite(&args.scenarios)?;
    for scenario in scenarios
        .iter()
        .filter(|s| args.filter.as_deref().map_or(true, |f| s.name.contains(f)))
    {
        println!("{} ({} steps)", scenario.name, scenario.steps.len());
    }
    Ok(())
}

/// Runs scenarios and reports them in the chosen format
#[derive(Debug)]
pub struct ScenarioRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl ScenarioRunner {
    /// Create a new runner
    #[must_use]
    pub fn new(config: CliConfig, format: OutputFormatArg) -> Self {
        // JSON goes to stdout; keep stderr to failures only.
        let quiet = config.verbosity.is_quiet() || format == OutputFormatArg::Json;
        let reporter = ProgressReporter::new(config.color.should_color(), quiet);
        Self { config, reporter }
    }

    /// Run `scenarios` on sessions from `factory`.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub async fn run<F: SessionFactory>(
        &mut self,
        runner: &SuiteRunner<F>,
        scenarios: &[Scenario],
    ) -> CliResult<SuiteReport> {
        let selected = runner.select(scenarios).len();
        if selected == 0 {
            self.reporter.warning("No scenarios selected");
        }

        self.reporter.header("Running scenarios");
        self.reporter
            .start_progress(selected as u64, "starting browser sessions");

        let show_steps = self.config.verbosity.is_verbose();
        let reporter = &self.reporter;
        let report = runner
            .run_with(scenarios, |outcome| {
                reporter.outcome(outcome, show_steps);
                reporter.increment(1);
            })
            .await?;

        self.reporter.finish();
        self.reporter.report(&report);
        Ok(report)
    }
}

/// Print the report in `format`
///
/// # Errors
///
/// Returns error if JSON rendering fails
pub fn emit(report: &SuiteReport, format: OutputFormatArg) -> CliResult<()> {
    if format == OutputFormatArg::Json {
        println!("{}", render_json(report)?);
    }
    Ok(())
}

/// Execute the `run` command end to end.
///
/// # Errors
///
/// Returns error for configuration problems or when the browser cannot be
/// started
pub async fn run(config: CliConfig, args: &RunArgs) -> CliResult<SuiteReport> {
    let suite_config = build_suite_config(args)?;
    let scenarios = load_suite(&args.scenarios)?;
    tracing::debug!(?suite_config, scenarios = scenarios.len(), "resolved configuration");
    run_with_browser(config, args, suite_config, &scenarios).await
}

#[cfg(feature = "browser")]
async fn run_with_browser(
    config: CliConfig,
    args: &RunArgs,
    suite_config: SuiteConfig,
    scenarios: &[Scenario],
) -> CliResult<SuiteReport> {
    use end2end::ChromiumFactory;

    let factory = ChromiumFactory::launch(suite_config.browser.clone())
        .await
        .map_err(|e| CliError::browser(e.to_string()))?;
    let mut suite = SuiteRunner::new(factory, suite_config);
    if let Some(ref filter) = args.filter {
        suite = suite.with_filter(filter.clone());
    }

    let mut runner = ScenarioRunner::new(config, args.format);
    let result = runner.run(&suite, scenarios).await;

    if let Err(e) = suite.into_factory().shutdown().await {
        tracing::warn!(error = %e, "browser did not shut down cleanly");
    }
    let report = result?;
    emit(&report, args.format)?;
    Ok(report)
}

#[cfg(not(feature = "browser"))]
async fn run_with_browser(
    _config: CliConfig,
    _args: &RunArgs,
    _suite_config: SuiteConfig,
    _scenarios: &[Scenario],
) -> CliResult<SuiteReport> {
    Err(CliError::browser(
        "built without the `browser` feature; rebuild with --features browser",
    ))
}
