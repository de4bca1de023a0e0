use quarry_config::LoggingConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogLevel};

/// Filter directive from, in order: `--log-level`, `--verbose`, the config file
pub fn filter_directive(cli: &Cli, config: &LoggingConfig) -> String {
    let level = match (cli.log_level, cli.verbose) {
        (Some(level), _) => Some(level),
        (None, true) => Some(LogLevel::Debug),
        (None, false) => None,
    };
    match level {
        Some(level) => {
            let level = LevelFilter::from(level).to_string().to_lowercase();
            LoggingConfig { level }.filter_directive()
        }
        None => config.filter_directive(),
    }
}

/// Install the global subscriber; logs go to stderr so output stays pipeable
pub fn init(cli: &Cli, config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(cli, config)))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["qry"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["normalize", "-d", "d.json"]);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_explicit_level_wins() {
        let cli = parse(&["-v", "-l", "trace"]);
        assert!(filter_directive(&cli, &LoggingConfig::default()).contains("quarry_core=trace"));
    }

    #[test]
    fn test_verbose_means_debug() {
        let cli = parse(&["-v"]);
        assert!(filter_directive(&cli, &LoggingConfig::default()).contains("quarry_state=debug"));
    }

    #[test]
    fn test_config_level_is_fallback() {
        let cli = parse(&[]);
        let config = LoggingConfig {
            level: "info".to_string(),
        };
        assert!(filter_directive(&cli, &config).contains("quarry_cli=info"));
    }
}
