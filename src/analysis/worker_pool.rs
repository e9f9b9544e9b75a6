//! Bounded-concurrency analysis of news items.
//!
//! A fixed pool of workers drains a task queue and reports every completion
//! on a results channel. Collection finishes once the channel is closed,
//! which happens only after every worker has exited.

use crate::llm::NewsAnalyzer;
use crate::models::{truncate_chars, AnalysisOutcome, AnalyzedItem, RawItem};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Default number of concurrent analysis calls.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Per-batch counters. `analyzed + no_symbol + failed == submitted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub submitted: usize,
    pub analyzed: usize,
    pub no_symbol: usize,
    pub failed: usize,
}

/// Output of one analyzer run. `items` is in completion order.
#[derive(Debug, Default)]
pub struct AnalysisBatch {
    pub items: Vec<AnalyzedItem>,
    pub stats: AnalysisStats,
}

/// What a worker reports for one task.
#[derive(Debug)]
enum TaskReport {
    Analyzed(AnalyzedItem),
    NoSymbol,
    Failed,
}

type TaskQueue = Arc<Mutex<mpsc::UnboundedReceiver<RawItem>>>;

/// Runs an analysis adapter over a batch with at most `concurrency` calls in flight.
pub struct BoundedAnalyzer {
    analyzer: Arc<dyn NewsAnalyzer>,
    concurrency: usize,
    task_timeout: Option<Duration>,
    progress: ProgressBar,
}

impl BoundedAnalyzer {
    /// Create an analyzer pool. A ceiling of 0 is treated as 1.
    pub fn new(analyzer: Arc<dyn NewsAnalyzer>, concurrency: usize) -> Self {
        Self {
            analyzer,
            concurrency: concurrency.max(1),
            task_timeout: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Fail any single call that runs longer than `timeout`.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Tick `progress` once per completed task.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Analyze every item. Never fails: per-item problems become counters.
    pub async fn run(&self, items: Vec<RawItem>) -> AnalysisBatch {
        let submitted = items.len();
        if submitted == 0 {
            return AnalysisBatch::default();
        }

        let (task_tx, task_rx) = mpsc::unbounded_channel();
        for item in items {
            if task_tx.send(item).is_err() {
                break;
            }
        }
        // Closing the queue lets workers exit once it is drained.
        drop(task_tx);

        let queue: TaskQueue = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        let worker_count = self.concurrency.min(submitted);
        info!(
            "Analyzing {} items with {} workers via {}",
            submitted,
            worker_count,
            self.analyzer.name()
        );

        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&queue),
                    result_tx.clone(),
                    Arc::clone(&self.analyzer),
                    self.task_timeout,
                ))
            })
            .collect();
        drop(result_tx);

        self.progress.set_length(submitted as u64);

        let mut batch = AnalysisBatch::default();
        batch.stats.submitted = submitted;

        while let Some(report) = result_rx.recv().await {
            match report {
                TaskReport::Analyzed(item) => {
                    batch.stats.analyzed += 1;
                    batch.items.push(item);
                }
                TaskReport::NoSymbol => batch.stats.no_symbol += 1,
                TaskReport::Failed => batch.stats.failed += 1,
            }
            self.progress.inc(1);
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                error!("Analysis worker terminated abnormally: {}", e);
            }
        }

        let reported = batch.stats.analyzed + batch.stats.no_symbol + batch.stats.failed;
        if reported < submitted {
            let lost = submitted - reported;
            warn!("{} analysis tasks never reported; counting them as failed", lost);
            batch.stats.failed += lost;
        }

        self.progress.finish_and_clear();

        info!(
            "Analysis complete: {} successful, {} without symbol, {} failed, {} submitted",
            batch.stats.analyzed, batch.stats.no_symbol, batch.stats.failed, batch.stats.submitted
        );

        batch
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: TaskQueue,
    results: mpsc::UnboundedSender<TaskReport>,
    analyzer: Arc<dyn NewsAnalyzer>,
    task_timeout: Option<Duration>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(item) = next else {
            break;
        };

        let report = analyze_one(analyzer.as_ref(), &item, task_timeout).await;
        if results.send(report).is_err() {
            break;
        }
    }
    debug!("Worker {} exiting", worker_id);
}

async fn analyze_one(
    analyzer: &dyn NewsAnalyzer,
    item: &RawItem,
    task_timeout: Option<Duration>,
) -> TaskReport {
    let short_title = truncate_chars(&item.title, 50);
    let call = AssertUnwindSafe(analyzer.analyze(&item.title, &item.body)).catch_unwind();

    let outcome = match task_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Analysis timed out after {:.1}s: {}",
                    limit.as_secs_f64(),
                    short_title
                );
                return TaskReport::Failed;
            }
        },
        None => call.await,
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(_) => {
            error!("Analysis adapter panicked on: {}", short_title);
            return TaskReport::Failed;
        }
    };

    match outcome {
        AnalysisOutcome::Success(payload) => match AnalyzedItem::from_payload(payload, item) {
            Some(analyzed) => {
                info!(
                    symbol = %analyzed.symbol,
                    direction = %analyzed.direction,
                    bias_score = analyzed.bias_score(),
                    "Analyzed: {}",
                    short_title
                );
                TaskReport::Analyzed(analyzed)
            }
            None => {
                debug!("Empty symbol in analysis, skipping: {}", short_title);
                TaskReport::NoSymbol
            }
        },
        AnalysisOutcome::NoSymbol => {
            debug!("No symbol found, skipping: {}", short_title);
            TaskReport::NoSymbol
        }
        AnalysisOutcome::Failure { reason } => {
            warn!("Analysis failed for '{}': {}", short_title, reason);
            TaskReport::Failed
        }
    }
}
