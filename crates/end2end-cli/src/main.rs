//! end2end: run the Leptos starter browser scenarios
//!
//! ## Usage
//!
//! ```bash
//! end2end run                                  # both scenarios against http://localhost:3000/
//! end2end run --filter button --headed         # one scenario, visible browser
//! end2end run --scenarios extra.yaml -j 4      # scenarios from a file
//! end2end run --format json > report.json      # machine-readable report
//! end2end list                                 # show scenario names
//! ```

use clap::Parser;
use end2end_cli::{runner, Cli, CliConfig, CliResult, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    end2end::init_tracing(config.verbosity.log_directive(), config.log_format);

    match cli.command {
        Commands::List(args) => {
            runner::list(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let report = runtime.block_on(runner::run(config, &args))?;
            Ok(ExitCode::from(report.exit_code()))
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}
