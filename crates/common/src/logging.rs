//! Tracing subscriber setup for the bridge binaries.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the event filter: `RUST_LOG` wins, otherwise the configured level.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed (tests and
/// embedding hosts may set their own first).
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);

    let installed = if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.is_ok()
}

/// Logging config for the CLI's `--verbose` / `--json-logs` switches.
pub fn cli_logging(verbose: bool, json: bool) -> LoggingConfig {
    LoggingConfig {
        level: if verbose { "debug" } else { "info" }.to_string(),
        json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_switch_selects_debug() {
        assert_eq!(cli_logging(true, false).level, "debug");
        assert_eq!(cli_logging(false, true).level, "info");
        assert!(cli_logging(false, true).json);
    }
}
