//! end2end CLI library
//!
//! Command-line runner for the Leptos starter browser scenarios.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, ListArgs, LogFormatArg, OutputFormatArg, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_json, ProgressReporter};
pub use runner::ScenarioRunner;
