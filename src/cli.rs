//! Command-line interface argument parsing.
//!
//! Every setting flag is optional so that it only overrides the config
//! file when actually given.

use crate::config::Provider;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// newswatch - LLM-assisted stock watchlist from market news
///
/// Fetches recent market headlines, asks a language model which listed
/// stock each one affects, and ranks the stocks with the strongest
/// directional bias.
///
/// Examples:
///   newswatch
///   newswatch --format markdown --output watchlist.md
///   newswatch --provider openai --model gpt-4o-mini --max-size 5
///   newswatch --input items.json --concurrency 2
///   newswatch --dry-run
///   newswatch --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .newswatch.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file for the report, or '-' for stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Output format (json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Maximum number of watchlist entries
    #[arg(long, value_name = "N")]
    pub max_size: Option<usize>,

    /// Number of concurrent analyses
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Minimum number of news items for a stock to be listed
    #[arg(long, value_name = "N")]
    pub min_news: Option<usize>,

    /// Model provider
    #[arg(long, value_name = "PROVIDER", env = "NEWSWATCH_PROVIDER")]
    pub provider: Option<Provider>,

    /// Model to use for analysis
    ///
    /// Defaults to llama3.2:latest for Ollama and gpt-4o-mini for OpenAI.
    #[arg(short, long, env = "NEWSWATCH_MODEL")]
    pub model: Option<String>,

    /// Provider API base URL
    #[arg(long, value_name = "URL", env = "NEWSWATCH_BASE_URL")]
    pub base_url: Option<String>,

    /// RSS feed URL to read (repeatable)
    #[arg(long = "feed", value_name = "URL")]
    pub feed: Vec<String>,

    /// Read raw items from a JSON file instead of RSS
    #[arg(long, value_name = "FILE", conflicts_with = "feed")]
    pub input: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: fetch and deduplicate news without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .newswatch.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON watchlist document (default)
    #[default]
    Json,
    /// Markdown report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        for feed in &self.feed {
            if !feed.starts_with("http://") && !feed.starts_with("https://") {
                return Err(format!("Feed URL must start with 'http://' or 'https://': {}", feed));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` comes from the config file; `--quiet` wins over it.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["newswatch"];
        argv.extend_from_slice(args);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_are_unset() {
        let args = parse(&[]);
        assert!(args.output.is_none());
        assert!(args.format.is_none());
        assert!(args.max_size.is_none());
        assert!(args.feed.is_empty());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let args = parse(&[
            "--format",
            "markdown",
            "--output",
            "-",
            "--max-size",
            "3",
            "--provider",
            "openai",
            "--feed",
            "https://a.example/rss",
        ]);
        assert_eq!(args.format, Some(OutputFormat::Markdown));
        assert_eq!(args.output.as_deref(), Some("-"));
        assert_eq!(args.max_size, Some(3));
        assert_eq!(args.provider, Some(Provider::Openai));
        assert_eq!(args.feed, vec!["https://a.example/rss".to_string()]);
    }

    #[test]
    fn test_input_conflicts_with_feed() {
        let result = Args::try_parse_from([
            "newswatch",
            "--input",
            "items.json",
            "--feed",
            "https://a.example/rss",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_invalid_urls() {
        assert!(parse(&["--base-url", "localhost:11434"]).validate().is_err());
        assert!(parse(&["--feed", "ftp://feed"]).validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        assert!(parse(&["--input", "/nonexistent/items.json"])
            .validate()
            .is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        assert!(parse(&["--verbose", "--quiet"]).validate().is_err());
        assert!(parse(&["--verbose", "--quiet", "--init-config"])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&[]).log_level(false), tracing::Level::INFO);
        assert_eq!(parse(&[]).log_level(true), tracing::Level::DEBUG);
        assert_eq!(parse(&["-v"]).log_level(false), tracing::Level::DEBUG);
        assert_eq!(parse(&["-q"]).log_level(true), tracing::Level::ERROR);
    }
}
