//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// mealgraph - plan a meal with a language model
#[derive(Parser)]
#[command(
    name = "mg",
    about = "Generate a recipe, check it against your rules, fix it if needed, and build a shopping list",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline for a preferences file
    Run {
        /// Preferences file (YAML or JSON)
        #[arg(short, long)]
        prefs: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Append pipeline events to this JSONL file
        #[arg(short, long)]
        events: Option<PathBuf>,
    },

    /// Check a recipe file against preferences with the local rules (no model call)
    Check {
        /// Preferences file (YAML or JSON)
        #[arg(short, long)]
        prefs: PathBuf,

        /// Recipe file (JSON or YAML)
        #[arg(short, long)]
        recipe: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the rules and their current thresholds
    Rules,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

/// Where `mg` writes its log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mealgraph")
        .join("logs")
        .join("mealgraph.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["mg", "run", "--prefs", "prefs.yml", "--format", "json"]).unwrap();
        match cli.command {
            Command::Run { prefs, format, events } => {
                assert_eq!(prefs, PathBuf::from("prefs.yml"));
                assert_eq!(format, OutputFormat::Json);
                assert!(events.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mg", "rules", "--log-level", "debug", "-c", "mg.yml"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("mg.yml")));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_path_location() {
        assert!(get_log_path().ends_with("mealgraph/logs/mealgraph.log"));
    }
}
