//! Tracing subscriber setup.
//!
//! Logs go to stderr so that `--format json` reports on stdout stay clean.
//! `RUST_LOG` overrides the default directive.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Default directive for a verbosity level (0 = warnings only)
#[must_use]
pub const fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "end2end=info,warn",
        2 => "end2end=debug,info",
        _ => "trace",
    }
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which is the
/// normal case in tests.
pub fn init_tracing(default: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(default))
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_grow_with_verbosity() {
        assert_eq!(default_directive(0), "warn");
        assert!(default_directive(1).contains("info"));
        assert!(default_directive(2).contains("debug"));
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn test_second_init_is_refused() {
        let _ = init_tracing("warn", LogFormat::Pretty);
        assert!(!init_tracing("warn", LogFormat::Json));
    }

    #[test]
    fn test_format_serde() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
