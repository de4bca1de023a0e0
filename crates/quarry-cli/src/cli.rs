use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable
    #[default]
    Text,
    /// Stored-query / JSON documents
    Json,
}

#[derive(Parser)]
#[command(name = "qry")]
#[command(about = "qry - inspect and edit stored Quarry queries")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/quarry/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

/// Inputs shared by every command
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Domain schema (JSON)
    #[arg(short, long)]
    pub domain: PathBuf,

    /// Stored query (JSON); an empty query when omitted
    #[arg(short, long)]
    pub query: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the normalised query
    Normalize {
        #[command(flatten)]
        input: QueryArgs,
    },

    /// List what can be navigated to at the end of the query
    Columns {
        #[command(flatten)]
        input: QueryArgs,
    },

    /// Append navigations to the query
    Navigate {
        #[command(flatten)]
        input: QueryArgs,

        /// Names to follow, in order
        #[arg(required = true)]
        path: Vec<String>,
    },

    /// Show a (possibly nested) column, e.g. `visit.code`
    Select {
        #[command(flatten)]
        input: QueryArgs,

        /// Dotted column path
        path: String,
    },

    /// Append a group step
    Group {
        #[command(flatten)]
        input: QueryArgs,

        /// Columns to group by
        #[arg(required = true)]
        columns: Vec<String>,
    },
}

impl Commands {
    pub fn input(&self) -> &QueryArgs {
        match self {
            Commands::Normalize { input }
            | Commands::Columns { input }
            | Commands::Navigate { input, .. }
            | Commands::Select { input, .. }
            | Commands::Group { input, .. } => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_navigate() {
        let cli = Cli::try_parse_from([
            "qry", "-v", "navigate", "--domain", "d.json", "patient", "visit",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Navigate { input, path } => {
                assert_eq!(input.domain, PathBuf::from("d.json"));
                assert!(input.query.is_none());
                assert_eq!(input.format, OutputFormat::Text);
                assert_eq!(path, vec!["patient", "visit"]);
            }
            _ => panic!("expected navigate"),
        }
    }

    #[test]
    fn test_parse_select_json_with_log_level() {
        let cli = Cli::try_parse_from([
            "qry", "select", "-d", "d.json", "-q", "q.json", "-f", "json", "visit.code", "-l", "trace",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert_eq!(cli.command.input().format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Select { ref path, .. } if path == "visit.code"));
    }

    #[test]
    fn test_group_requires_columns() {
        assert!(Cli::try_parse_from(["qry", "group", "-d", "d.json"]).is_err());
    }
}
