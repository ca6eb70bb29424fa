//! Output formatting and progress reporting

use console::{style, Style, Term};
use end2end::{ScenarioOutcome, SuiteReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for scenario execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar for multiple scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn write_line(&self, line: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.suspend(|| {
                let _ = self.term.write_line(line);
            }),
            None => {
                let _ = self.term.write_line(line);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.write_line("");
        self.write_line(&styled);
    }

    /// Report one finished scenario; failures include the failing step
    pub fn outcome(&self, outcome: &ScenarioOutcome, show_steps: bool) {
        let timing = format!("({}ms)", outcome.duration.as_millis());
        if outcome.passed {
            self.success(&format!("{} {timing}", outcome.name));
            if show_steps && !self.quiet {
                for step in &outcome.steps {
                    self.write_line(&format!("    {}", step.description));
                }
            }
            return;
        }

        self.failure(&format!("{} {timing}", outcome.name));
        if let Some(ref failure) = outcome.failure {
            match (&failure.step_index, &failure.step) {
                (Some(index), Some(step)) => {
                    self.write_line(&format!("    step {}: {step}", index + 1));
                }
                _ => self.write_line("    session setup"),
            }
            self.write_line(&format!("    {}", failure.message));
        }
    }

    /// Print suite summary
    pub fn summary(&self, passed: usize, failed: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let total = passed + failed;
        let duration_secs = duration.as_secs_f64();

        self.write_line("");
        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();

            let status = if failed > 0 || total == 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            self.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 || total == 0 {
                "FAILED"
            } else {
                "PASSED"
            };
            self.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }

    /// Summarize a finished report
    pub fn report(&self, report: &SuiteReport) {
        self.summary(report.passed(), report.failed(), report.duration);
    }
}

/// Render a report as pretty JSON
///
/// # Errors
///
/// Returns error if serialization fails
pub fn render_json(report: &SuiteReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
