//! End-to-end watchlist generation.
//!
//! Stages run in sequence: Fetched, Deduplicated, Analyzed, Ranked. Each
//! stage only consumes the previous stage's output. A failing source is
//! the one adapter error absorbed here; it degrades to an empty run.

use crate::analysis::{build_entries, dedup_by_title, rank, AggregationRules, BoundedAnalyzer};
use crate::analysis::ranker::DEFAULT_MAX_WATCHLIST_SIZE;
use crate::analysis::worker_pool::DEFAULT_CONCURRENCY;
use crate::error::ConfigError;
use crate::llm::NewsAnalyzer;
use crate::models::{RawItem, RunMetadata, WatchlistResult};
use crate::source::NewsSource;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use indicatif::ProgressBar;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Settings consumed by the pipeline core.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_watchlist_size: usize,
    pub concurrency: usize,
    pub rules: AggregationRules,
    /// Upper bound on a single analysis call.
    pub analysis_timeout: Option<Duration>,
    /// Timezone for `generatedAt` and entry dates.
    pub reporting_offset: FixedOffset,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_watchlist_size: DEFAULT_MAX_WATCHLIST_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            rules: AggregationRules::default(),
            analysis_timeout: Some(Duration::from_secs(60)),
            reporting_offset: ist_offset(),
        }
    }
}

/// UTC+05:30.
pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(|| Utc.fix())
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_watchlist_size < 1 {
            return Err(ConfigError::BelowOne {
                field: "max_watchlist_size",
            });
        }
        if self.concurrency < 1 {
            return Err(ConfigError::BelowOne {
                field: "concurrency",
            });
        }
        if self.rules.min_news_count < 1 {
            return Err(ConfigError::BelowOne {
                field: "min_news_count",
            });
        }

        let high = self.rules.high_threshold;
        let medium = self.rules.medium_threshold;
        if !(high.is_finite() && medium.is_finite() && high > medium && medium >= 0.0) {
            return Err(ConfigError::Thresholds { high, medium });
        }

        Ok(())
    }
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Fetched,
    Deduplicated,
    Analyzed,
    Ranked,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetched => write!(f, "fetched"),
            Stage::Deduplicated => write!(f, "deduplicated"),
            Stage::Analyzed => write!(f, "analyzed"),
            Stage::Ranked => write!(f, "ranked"),
        }
    }
}

/// Generates watchlists from an injected source and analyzer.
pub struct WatchlistPipeline {
    config: PipelineConfig,
    source: Arc<dyn NewsSource>,
    analyzer: Arc<dyn NewsAnalyzer>,
    progress: ProgressBar,
}

impl WatchlistPipeline {
    /// Validate `config` and build the pipeline. No I/O happens here.
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn NewsSource>,
        analyzer: Arc<dyn NewsAnalyzer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            analyzer,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report analysis progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run every stage and return the result envelope.
    pub async fn generate_watchlist(&self) -> WatchlistResult {
        self.generate_watchlist_at(Utc::now()).await
    }

    /// Same as [`generate_watchlist`](Self::generate_watchlist) with a fixed run time.
    pub async fn generate_watchlist_at(&self, now: DateTime<Utc>) -> WatchlistResult {
        let generated_at = now.with_timezone(&self.config.reporting_offset);
        let as_of = generated_at.date_naive();
        let mut metadata = RunMetadata::empty(generated_at);

        let fetched = self.fetch().await;
        metadata.total_news_fetched = fetched.len();
        info!(stage = %Stage::Fetched, count = fetched.len(), "Fetched news items");

        if fetched.is_empty() {
            warn!("No news items fetched");
            return WatchlistResult::empty(metadata);
        }

        let unique = dedup_by_title(fetched);
        metadata.total_unique = unique.len();
        info!(stage = %Stage::Deduplicated, count = unique.len(), "Removed duplicate titles");

        let pool = BoundedAnalyzer::new(Arc::clone(&self.analyzer), self.config.concurrency)
            .with_progress(self.progress.clone());
        let pool = match self.config.analysis_timeout {
            Some(timeout) => pool.with_task_timeout(timeout),
            None => pool,
        };
        let batch = pool.run(unique).await;

        metadata.total_analyzed = batch.stats.analyzed;
        metadata.total_no_symbol = batch.stats.no_symbol;
        metadata.total_failed = batch.stats.failed;
        info!(
            stage = %Stage::Analyzed,
            analyzed = batch.stats.analyzed,
            no_symbol = batch.stats.no_symbol,
            failed = batch.stats.failed,
            "Analysis finished"
        );

        if batch.items.is_empty() {
            warn!("No successful analyses");
            return WatchlistResult::empty(metadata);
        }

        let entries = build_entries(batch.items, &self.config.rules, as_of);
        let ranking = rank(entries, self.config.max_watchlist_size);

        metadata.watchlist_size = ranking.ranked.len();
        metadata.bullish_count = ranking.bullish.len();
        metadata.bearish_count = ranking.bearish.len();
        info!(
            stage = %Stage::Ranked,
            count = ranking.ranked.len(),
            bullish = ranking.bullish.len(),
            bearish = ranking.bearish.len(),
            "Watchlist generated"
        );

        WatchlistResult {
            watchlist: ranking.ranked,
            bullish_stocks: ranking.bullish,
            bearish_stocks: ranking.bearish,
            metadata,
        }
    }

    async fn fetch(&self) -> Vec<RawItem> {
        fetch_or_empty(self.source.as_ref()).await
    }
}

/// Fetch and deduplicate without analysis. Returns the fetched count too.
pub async fn preview(source: &dyn NewsSource) -> (usize, Vec<RawItem>) {
    let fetched = fetch_or_empty(source).await;
    let count = fetched.len();
    (count, dedup_by_title(fetched))
}

/// A failing source counts as an empty fetch.
async fn fetch_or_empty(source: &dyn NewsSource) -> Vec<RawItem> {
    match source.fetch().await {
        Ok(items) => items,
        Err(e) => {
            error!("Error fetching from {}: {}", source.name(), e);
            Vec::new()
        }
    }
}
