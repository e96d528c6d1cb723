//! Logging setup.

use eyre::Result;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogArgs;

/// Builds the log filter.
///
/// Precedence:
/// 1. If `--quiet` is set, only errors are shown
/// 2. Otherwise, start with `RUST_LOG` if set, or a level from the verbosity flags
/// 3. Apply any custom filter from `--log.filter`
pub fn env_filter(args: &LogArgs) -> EnvFilter {
    if args.quiet {
        return EnvFilter::new("error");
    }

    let base_level = match args.verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

    if let Some(custom_filter) = &args.filter {
        for directive in custom_filter.split(',') {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
    }

    filter
}

/// Initialize logging based on command line arguments.
///
/// Logs go to stderr; stdout is reserved for command output.
pub fn init_logging(args: &LogArgs) -> Result<()> {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false);
    let layer = if args.json { layer.json().boxed() } else { layer.without_time().boxed() };

    tracing_subscriber::registry().with(layer).with(env_filter(args)).try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins() {
        let args = LogArgs { quiet: true, verbosity: 3, ..Default::default() };
        assert_eq!(env_filter(&args).to_string(), "error");
    }

    #[test]
    fn test_custom_directives_added() {
        let args = LogArgs {
            filter: Some("pledge_session=trace,not a directive".to_string()),
            ..Default::default()
        };
        assert!(env_filter(&args).to_string().contains("pledge_session=trace"));
    }
}
