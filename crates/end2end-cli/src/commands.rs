//! CLI command definitions using clap

use crate::config::ColorChoice;
use clap::{Parser, Subcommand, ValueEnum};
use end2end::{LoadState, LogFormat};
use std::path::PathBuf;

/// end2end: browser scenarios for the Leptos starter page
#[derive(Parser, Debug)]
#[command(name = "end2end")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures are printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against a live server
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Root URL of the site under test [env: END2END_BASE_URL] [default: http://localhost:3000/]
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable [env: CHROMIUM_PATH]
    #[arg(long, value_name = "PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Expectation and action timeout in milliseconds [env: END2END_TIMEOUT_MS]
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Navigation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub navigation_timeout: Option<u64>,

    /// Delay between polls in milliseconds [env: END2END_POLL_INTERVAL_MS]
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Load state navigation waits for (load, domcontentloaded, networkidle)
    #[arg(long, value_name = "STATE")]
    pub wait_until: Option<LoadState>,

    /// Number of scenarios run in parallel (0 = number of CPUs)
    #[arg(short = 'j', long, default_value = "0")]
    pub jobs: usize,

    /// Only run scenarios whose name contains PATTERN
    #[arg(short, long, value_name = "PATTERN")]
    pub filter: Option<String>,

    /// YAML scenario files to run instead of the built-in suite
    #[arg(long = "scenarios", value_name = "FILE")]
    pub scenarios: Vec<PathBuf>,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// YAML scenario files to list instead of the built-in suite
    #[arg(long = "scenarios", value_name = "FILE")]
    pub scenarios: Vec<PathBuf>,

    /// Only list scenarios whose name contains PATTERN
    #[arg(short, long, value_name = "PATTERN")]
    pub filter: Option<String>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// Progress and summary on stderr
    #[default]
    Text,
    /// JSON report on stdout
    Json,
}
