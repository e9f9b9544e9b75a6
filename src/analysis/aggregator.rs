//! Per-symbol aggregation of analyses into watchlist candidates.
//!
//! Output is a pure function of the set of analyses: inputs are put in a
//! canonical order first and groups are kept in a `BTreeMap`, so completion
//! order upstream never changes the result.

use crate::models::{AnalyzedItem, Direction, Priority, WatchlistEntry};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Default minimum number of analyses a symbol needs.
pub const DEFAULT_MIN_NEWS_COUNT: usize = 1;
/// Default average bias score for High priority.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 2.5;
/// Default average bias score for Medium priority.
pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 1.5;

/// Thresholds applied when turning groups into entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationRules {
    pub min_news_count: usize,
    pub high_threshold: f64,
    pub medium_threshold: f64,
}

impl Default for AggregationRules {
    fn default() -> Self {
        Self {
            min_news_count: DEFAULT_MIN_NEWS_COUNT,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            medium_threshold: DEFAULT_MEDIUM_THRESHOLD,
        }
    }
}

/// Running totals for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolAggregate {
    analyses: Vec<AnalyzedItem>,
    total_bias_score: f64,
    direction_counts: BTreeMap<Direction, usize>,
    latest_published_at: DateTime<Utc>,
}

impl SymbolAggregate {
    /// Start a group from its first analysis.
    pub fn new(first: AnalyzedItem) -> Self {
        let mut aggregate = Self {
            analyses: Vec::new(),
            total_bias_score: 0.0,
            direction_counts: BTreeMap::new(),
            latest_published_at: first.source_published_at,
        };
        aggregate.add(first);
        aggregate
    }

    /// Fold another analysis into the group.
    pub fn add(&mut self, item: AnalyzedItem) {
        self.total_bias_score += item.bias_score();
        *self.direction_counts.entry(item.direction).or_insert(0) += 1;
        if item.source_published_at > self.latest_published_at {
            self.latest_published_at = item.source_published_at;
        }
        self.analyses.push(item);
    }

    pub fn news_count(&self) -> usize {
        self.analyses.len()
    }

    pub fn average_bias_score(&self) -> f64 {
        if self.analyses.is_empty() {
            0.0
        } else {
            self.total_bias_score / self.analyses.len() as f64
        }
    }

    pub fn latest_published_at(&self) -> DateTime<Utc> {
        self.latest_published_at
    }

    /// Most frequent direction. Ties go to the earliest in
    /// Bullish, Bearish, Neutral order. `None` if nothing was tallied.
    pub fn dominant_direction(&self) -> Option<Direction> {
        let mut best: Option<(Direction, usize)> = None;
        for direction in Direction::ALL {
            let count = self.direction_counts.get(&direction).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((direction, count)),
            }
        }
        best.map(|(direction, _)| direction)
    }

    /// Rationale of the analysis with the highest bias score, first one on ties.
    pub fn representative_rationale(&self) -> Option<&str> {
        let mut best: Option<&AnalyzedItem> = None;
        for item in &self.analyses {
            match best {
                Some(current) if item.bias_score() <= current.bias_score() => {}
                _ => best = Some(item),
            }
        }
        best.map(|item| item.rationale.as_str())
    }
}

/// Why a group did not make it onto the watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewNews,
    Neutral,
    LowPriority,
    Anomaly,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewNews => write!(f, "too few news items"),
            SkipReason::Neutral => write!(f, "neutral direction"),
            SkipReason::LowPriority => write!(f, "low priority"),
            SkipReason::Anomaly => write!(f, "empty direction tally"),
        }
    }
}

/// Insert an analysis into its symbol's group, creating the group on first sight.
pub fn upsert(groups: &mut BTreeMap<String, SymbolAggregate>, item: AnalyzedItem) {
    match groups.entry(item.symbol.clone()) {
        Entry::Occupied(mut occupied) => occupied.get_mut().add(item),
        Entry::Vacant(vacant) => {
            vacant.insert(SymbolAggregate::new(item));
        }
    }
}

/// Group analyses by symbol.
///
/// Within a group analyses are ordered by publish time, then rationale,
/// then id, whatever order they arrived in.
pub fn group_by_symbol(mut items: Vec<AnalyzedItem>) -> BTreeMap<String, SymbolAggregate> {
    items.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.source_published_at.cmp(&b.source_published_at))
            .then_with(|| a.rationale.cmp(&b.rationale))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut groups = BTreeMap::new();
    for item in items {
        upsert(&mut groups, item);
    }
    groups
}

/// Turn one group into a watchlist entry, or say why it is skipped.
pub fn evaluate(
    symbol: &str,
    aggregate: &SymbolAggregate,
    rules: &AggregationRules,
    as_of: NaiveDate,
) -> Result<WatchlistEntry, SkipReason> {
    let news_count = aggregate.news_count();
    if news_count < rules.min_news_count {
        return Err(SkipReason::TooFewNews);
    }

    let (direction, reason) = match (
        aggregate.dominant_direction(),
        aggregate.representative_rationale(),
    ) {
        (Some(direction), Some(reason)) => (direction, reason),
        _ => return Err(SkipReason::Anomaly),
    };

    if direction == Direction::Neutral {
        return Err(SkipReason::Neutral);
    }

    let bias_score = aggregate.average_bias_score();
    let priority = Priority::from_score(bias_score, rules.high_threshold, rules.medium_threshold);
    if priority == Priority::Low {
        return Err(SkipReason::LowPriority);
    }

    Ok(WatchlistEntry {
        symbol: symbol.to_string(),
        direction,
        priority,
        bias_score,
        reason: reason.to_string(),
        news_count,
        latest_published_at: aggregate.latest_published_at(),
        as_of_date: as_of,
    })
}

/// Aggregate analyses into candidate entries, in ascending symbol order.
pub fn build_entries(
    items: Vec<AnalyzedItem>,
    rules: &AggregationRules,
    as_of: NaiveDate,
) -> Vec<WatchlistEntry> {
    let groups = group_by_symbol(items);
    let mut entries = Vec::with_capacity(groups.len());

    for (symbol, aggregate) in &groups {
        match evaluate(symbol, aggregate, rules, as_of) {
            Ok(entry) => entries.push(entry),
            Err(SkipReason::Anomaly) => {
                warn!(symbol = %symbol, "Skipping malformed symbol group: {}", SkipReason::Anomaly)
            }
            Err(reason) => debug!(symbol = %symbol, "Skipping symbol: {}", reason),
        }
    }

    debug!(
        "Aggregated {} symbols into {} candidates",
        groups.len(),
        entries.len()
    );
    entries
}
