//! newswatch - LLM-assisted stock watchlist from market news
//!
//! Fetches news, has a language model attribute each item to a stock with
//! a directional bias, and ranks the stocks into a short watchlist.
//!
//! Exit codes:
//!   0 - Success (including runs that produce an empty watchlist)
//!   1 - Fatal error (invalid configuration, unwritable output, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod pipeline;
mod report;
mod source;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, Provider, SourceKind, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use llm::{NewsAnalyzer, OllamaAnalyzer, OpenAiAnalyzer};
use pipeline::WatchlistPipeline;
use source::{FileSource, NewsSource, RssSource};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if args.init_config {
        return handle_init_config();
    }

    let mut config = match Config::resolve(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("newswatch v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    log_config_source(&args);

    if let Err(e) = run(args, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .newswatch.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize feeds, model, thresholds, and more.");
    Ok(())
}

/// Log to stderr so stdout stays clean for `--output -`.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let pipeline_config = config
        .pipeline_config()
        .context("Invalid pipeline configuration")?;
    config
        .validate_source()
        .context("Invalid source configuration")?;

    let source = build_source(&config)?;

    if args.dry_run {
        return handle_dry_run(source.as_ref()).await;
    }

    let analyzer = build_analyzer(&config)?;
    info!(
        "Using {} model {} ({} workers)",
        analyzer.name(),
        config.model.effective_name(),
        pipeline_config.concurrency
    );

    let pipeline = WatchlistPipeline::new(pipeline_config, source, analyzer)
        .context("Invalid pipeline configuration")?
        .with_progress(progress_bar(args.quiet));

    let result = pipeline.generate_watchlist().await;

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&result)?,
        OutputFormat::Markdown => report::generate_markdown_report(&result),
    };
    report::write_report(&output, &config.general.output)?;

    let meta = &result.metadata;
    info!(
        "Fetched {} ({} unique), analyzed {}, no symbol {}, failed {}",
        meta.total_news_fetched,
        meta.total_unique,
        meta.total_analyzed,
        meta.total_no_symbol,
        meta.total_failed
    );
    info!(
        "Watchlist: {} stocks ({} bullish, {} bearish) in {:.1}s",
        meta.watchlist_size,
        meta.bullish_count,
        meta.bearish_count,
        start_time.elapsed().as_secs_f64()
    );
    if config.general.output != "-" {
        info!("Report saved to: {}", config.general.output);
    }

    Ok(())
}

/// Handle --dry-run: fetch and deduplicate, print what would be analyzed.
async fn handle_dry_run(source: &dyn NewsSource) -> Result<()> {
    eprintln!("\n🔍 Dry run: fetching news (no model calls)...\n");

    let (fetched, unique) = pipeline::preview(source).await;

    if unique.is_empty() {
        eprintln!("   No news items found.");
    } else {
        eprintln!(
            "   {} items fetched, {} would be analyzed:\n",
            fetched,
            unique.len()
        );
        for item in &unique {
            println!(
                "{}  {}",
                item.published_at.format("%Y-%m-%d %H:%M"),
                item.title
            );
        }
    }

    eprintln!("\n✅ Dry run complete. No model calls were made.");
    Ok(())
}

/// Say where the configuration came from.
fn log_config_source(args: &Args) {
    match args.config {
        Some(ref path) => info!("Loading config from: {}", path.display()),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Loading default config from {}", DEFAULT_CONFIG_FILE)
        }
        None => debug!("No config file found, using defaults"),
    }
}

fn build_source(config: &Config) -> Result<Arc<dyn NewsSource>> {
    let settings = &config.source;
    let source: Arc<dyn NewsSource> = match settings.kind {
        SourceKind::Rss => Arc::new(
            RssSource::new(
                settings.feed_urls.clone(),
                settings.max_items,
                settings.timeout_seconds,
            )
            .context("Failed to build HTTP client")?,
        ),
        SourceKind::File => {
            let path = settings
                .path
                .clone()
                .context("source.path is required for file sources")?;
            Arc::new(FileSource::new(path, settings.max_items))
        }
    };
    Ok(source)
}

fn build_analyzer(config: &Config) -> Result<Arc<dyn NewsAnalyzer>> {
    let provider_config = config
        .provider_config()
        .context("Invalid model configuration")?;

    let analyzer: Arc<dyn NewsAnalyzer> = match config.model.provider {
        Provider::Ollama => Arc::new(OllamaAnalyzer::new(provider_config)?),
        Provider::Openai => Arc::new(OpenAiAnalyzer::new(provider_config)?),
    };
    Ok(analyzer)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} analyzed ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
