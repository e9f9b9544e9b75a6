//! Configuration file handling.
//!
//! Settings come from `.newswatch.toml` (or `--config`), with CLI flags
//! layered on top. [`Config::pipeline_config`] is the single gate that
//! turns them into a validated [`PipelineConfig`].

use crate::analysis::AggregationRules;
use crate::cli::{Args, OutputFormat};
use crate::error::ConfigError;
use crate::llm::ProviderConfig;
use crate::pipeline::PipelineConfig;
use crate::source::rss::DEFAULT_FEED_URL;
use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".newswatch.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report path, or `-` for stdout.
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "-".to_string()
}

/// Core pipeline settings, as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_max_watchlist_size")]
    pub max_watchlist_size: usize,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_min_news_count")]
    pub min_news_count: usize,

    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,

    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,

    /// Per-item analysis timeout. 0 disables it.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_seconds: u64,

    /// Offset used for run dates, e.g. `+05:30`.
    #[serde(default = "default_utc_offset")]
    pub reporting_utc_offset: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_watchlist_size: default_max_watchlist_size(),
            concurrency: default_concurrency(),
            min_news_count: default_min_news_count(),
            high_threshold: default_high_threshold(),
            medium_threshold: default_medium_threshold(),
            analysis_timeout_seconds: default_analysis_timeout(),
            reporting_utc_offset: default_utc_offset(),
        }
    }
}

fn default_max_watchlist_size() -> usize {
    crate::analysis::ranker::DEFAULT_MAX_WATCHLIST_SIZE
}

fn default_concurrency() -> usize {
    crate::analysis::worker_pool::DEFAULT_CONCURRENCY
}

fn default_min_news_count() -> usize {
    crate::analysis::aggregator::DEFAULT_MIN_NEWS_COUNT
}

fn default_high_threshold() -> f64 {
    crate::analysis::aggregator::DEFAULT_HIGH_THRESHOLD
}

fn default_medium_threshold() -> f64 {
    crate::analysis::aggregator::DEFAULT_MEDIUM_THRESHOLD
}

fn default_analysis_timeout() -> u64 {
    60
}

fn default_utc_offset() -> String {
    "+05:30".to_string()
}

/// Model provider backing the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local Ollama server (default)
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions API
    Openai,
}

/// LLM model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Model name. Defaults per provider when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// API base URL. Defaults per provider when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for a single model call.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: None,
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_model_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_model_timeout() -> u64 {
    60
}

impl ModelConfig {
    pub fn effective_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| match self.provider {
            Provider::Ollama => "llama3.2:latest".to_string(),
            Provider::Openai => "gpt-4o-mini".to_string(),
        })
    }

    pub fn effective_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider {
            Provider::Ollama => "http://localhost:11434".to_string(),
            Provider::Openai => "https://api.openai.com".to_string(),
        })
    }
}

/// Where raw news comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Rss,
    File,
}

/// News source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default = "default_feed_urls")]
    pub feed_urls: Vec<String>,

    /// JSON file of raw items, for `kind = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Cap on items taken per fetch.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            feed_urls: default_feed_urls(),
            path: None,
            max_items: default_max_items(),
            timeout_seconds: default_source_timeout(),
        }
    }
}

fn default_feed_urls() -> Vec<String> {
    vec![DEFAULT_FEED_URL.to_string()]
}

fn default_max_items() -> usize {
    10
}

fn default_source_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `.newswatch.toml` from the working directory if it exists.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// `--config` if given, else the default file, else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_default()?.unwrap_or_default()),
        }
    }

    /// Apply CLI arguments. Only flags that were actually given override.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(max_size) = args.max_size {
            self.pipeline.max_watchlist_size = max_size;
        }
        if let Some(concurrency) = args.concurrency {
            self.pipeline.concurrency = concurrency;
        }
        if let Some(min_news) = args.min_news {
            self.pipeline.min_news_count = min_news;
        }

        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = Some(model.clone());
        }
        if let Some(ref base_url) = args.base_url {
            self.model.base_url = Some(base_url.clone());
        }

        if !args.feed.is_empty() {
            self.source.kind = SourceKind::Rss;
            self.source.feed_urls = args.feed.clone();
        }
        if let Some(ref input) = args.input {
            self.source.kind = SourceKind::File;
            self.source.path = Some(input.clone());
        }
    }

    /// Validate and build the core pipeline settings.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let section = &self.pipeline;
        let timeout = match section.analysis_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let config = PipelineConfig {
            max_watchlist_size: section.max_watchlist_size,
            concurrency: section.concurrency,
            rules: AggregationRules {
                min_news_count: section.min_news_count,
                high_threshold: section.high_threshold,
                medium_threshold: section.medium_threshold,
            },
            analysis_timeout: timeout,
            reporting_offset: parse_utc_offset(&section.reporting_utc_offset)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Provider settings, with the API key read from the environment.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let api_key = std::env::var(&self.model.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if self.model.provider == Provider::Openai && api_key.is_none() {
            return Err(ConfigError::Missing(format!(
                "API key (set {})",
                self.model.api_key_env
            )));
        }

        Ok(ProviderConfig {
            base_url: self.model.effective_base_url(),
            model_name: self.model.effective_name(),
            api_key,
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
            timeout_seconds: self.model.timeout_seconds,
        })
    }

    /// Check the source section can be built.
    pub fn validate_source(&self) -> Result<(), ConfigError> {
        if self.source.max_items < 1 {
            return Err(ConfigError::BelowOne {
                field: "source.max_items",
            });
        }
        match self.source.kind {
            SourceKind::Rss if self.source.feed_urls.is_empty() => {
                Err(ConfigError::Missing("source.feed_urls".to_string()))
            }
            SourceKind::File if self.source.path.is_none() => {
                Err(ConfigError::Missing("source.path".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, `Z` or `UTC` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::UtcOffset(raw.to_string());
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) || rest.len() > 5 {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "-");
        assert_eq!(config.pipeline.max_watchlist_size, 10);
        assert_eq!(config.pipeline.concurrency, 5);
        assert_eq!(config.model.provider, Provider::Ollama);
        assert_eq!(config.model.effective_name(), "llama3.2:latest");
        assert_eq!(config.source.feed_urls, vec![DEFAULT_FEED_URL.to_string()]);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "watchlist.md"
format = "markdown"

[pipeline]
max_watchlist_size = 5
high_threshold = 3.0
reporting_utc_offset = "+00:00"

[model]
provider = "openai"
temperature = 0.2

[source]
kind = "file"
path = "items.json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "watchlist.md");
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.pipeline.max_watchlist_size, 5);
        assert_eq!(config.pipeline.concurrency, 5);
        assert_eq!(config.pipeline.high_threshold, 3.0);
        assert_eq!(config.model.provider, Provider::Openai);
        assert_eq!(config.model.effective_name(), "gpt-4o-mini");
        assert_eq!(config.model.effective_base_url(), "https://api.openai.com");
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.path, Some(PathBuf::from("items.json")));
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[pipeline]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[source]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[pipeline]\nconcurrency = 2\n").unwrap();

        let config = Config::resolve(Some(file.path())).unwrap();
        assert_eq!(config.pipeline.concurrency, 2);
        assert!(Config::load(Path::new("/nonexistent/newswatch.toml")).is_err());
    }

    #[test]
    fn test_merge_only_overrides_given_flags() {
        let mut config = Config::default();
        config.pipeline.concurrency = 3;
        config.pipeline.min_news_count = 2;

        let args = Args::parse_from(["newswatch", "--max-size", "7", "--provider", "openai"]);
        config.merge_with_args(&args);

        assert_eq!(config.pipeline.max_watchlist_size, 7);
        assert_eq!(config.pipeline.concurrency, 3);
        assert_eq!(config.pipeline.min_news_count, 2);
        assert_eq!(config.model.provider, Provider::Openai);
    }

    #[test]
    fn test_verbose_from_file_sets_log_level() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = Args::parse_from(["newswatch"]);
        config.merge_with_args(&args);

        assert!(config.general.verbose);
        assert_eq!(
            args.log_level(config.general.verbose),
            tracing::Level::DEBUG
        );

        let quiet = Args::parse_from(["newswatch", "--quiet"]);
        assert_eq!(
            quiet.log_level(config.general.verbose),
            tracing::Level::ERROR
        );
    }

    #[test]
    fn test_merge_source_flags() {
        let mut config = Config::default();
        let args = Args::parse_from([
            "newswatch",
            "--feed",
            "https://a.example/rss",
            "--feed",
            "https://b.example/rss",
        ]);
        config.merge_with_args(&args);
        assert_eq!(config.source.feed_urls.len(), 2);

        let args = Args::parse_from(["newswatch", "--input", "items.json"]);
        config.merge_with_args(&args);
        assert_eq!(config.source.kind, SourceKind::File);
        assert!(config.validate_source().is_ok());
    }

    #[test]
    fn test_pipeline_config_validation() {
        let config = Config::default();
        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.reporting_offset.local_minus_utc(), 19800);
        assert_eq!(pipeline.analysis_timeout, Some(Duration::from_secs(60)));

        let mut bad = Config::default();
        bad.pipeline.concurrency = 0;
        assert_eq!(
            bad.pipeline_config(),
            Err(ConfigError::BelowOne {
                field: "concurrency"
            })
        );

        let mut bad = Config::default();
        bad.pipeline.medium_threshold = 3.0;
        assert!(matches!(
            bad.pipeline_config(),
            Err(ConfigError::Thresholds { .. })
        ));

        let mut bad = Config::default();
        bad.pipeline.reporting_utc_offset = "IST".to_string();
        assert!(matches!(bad.pipeline_config(), Err(ConfigError::UtcOffset(_))));

        let mut no_timeout = Config::default();
        no_timeout.pipeline.analysis_timeout_seconds = 0;
        assert_eq!(no_timeout.pipeline_config().unwrap().analysis_timeout, None);
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("-0400").unwrap().local_minus_utc(), -14400);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("05:30").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("+5:30").is_err());
    }

    #[test]
    fn test_provider_config_requires_openai_key() {
        let mut config = Config::default();
        config.model.provider = Provider::Openai;
        config.model.api_key_env = "NEWSWATCH_TEST_UNSET_KEY".to_string();
        assert!(matches!(
            config.provider_config(),
            Err(ConfigError::Missing(_))
        ));

        config.model.provider = Provider::Ollama;
        let provider = config.provider_config().unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.api_key, None);
    }

    #[test]
    fn test_validate_source() {
        let mut config = Config::default();
        assert!(config.validate_source().is_ok());

        config.source.kind = SourceKind::File;
        assert_eq!(
            config.validate_source(),
            Err(ConfigError::Missing("source.path".to_string()))
        );

        config.source.kind = SourceKind::Rss;
        config.source.feed_urls.clear();
        assert!(config.validate_source().is_err());
    }
}
