//! Logging initialization
//!
//! Everything goes to stderr; stdout is reserved for the reassembled stream.

use anyhow::{anyhow, Result};
use tcpreasm_core::config::LoggingConfig;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Initialize logging from CLI arguments, falling back to the config file
pub fn init(args: &Args, config: &LoggingConfig) -> Result<()> {
    let level = level_for(args, config)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = if args.log_format == LogFormat::Text && config.json_format {
        LogFormat::Json
    } else {
        args.log_format
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(args.verbose >= 2)
                    .with_thread_ids(args.verbose >= 3)
                    .with_file(args.verbose >= 3)
                    .with_line_number(args.verbose >= 3),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

/// `-q` and `-v` win over the configured level
fn level_for(args: &Args, config: &LoggingConfig) -> Result<Level> {
    if args.quiet {
        return Ok(Level::ERROR);
    }
    match args.verbose {
        0 => config
            .level
            .parse()
            .map_err(|_| anyhow!("Invalid log level in config: {:?}", config.level)),
        1 => Ok(Level::DEBUG),
        _ => Ok(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(argv)
    }

    #[test]
    fn test_level_from_config() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            json_format: false,
        };
        let level = level_for(&args(&["tcpreasm", "config", "show"]), &config).unwrap();
        assert_eq!(level, Level::WARN);
    }

    #[test]
    fn test_flags_override_config() {
        let config = LoggingConfig::default();
        assert_eq!(
            level_for(&args(&["tcpreasm", "-vv", "config", "show"]), &config).unwrap(),
            Level::TRACE
        );
        assert_eq!(
            level_for(&args(&["tcpreasm", "-q", "config", "show"]), &config).unwrap(),
            Level::ERROR
        );
    }

    #[test]
    fn test_bad_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            json_format: false,
        };
        assert!(level_for(&args(&["tcpreasm", "config", "show"]), &config).is_err());
    }
}
