//! Data models for the watchlist pipeline.
//!
//! This module contains the core data structures that flow through the
//! pipeline: raw news items, model analyses, per-symbol watchlist entries
//! and the final result envelope.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of an instrument symbol.
pub const MAX_SYMBOL_LEN: usize = 20;

/// Maximum length of an analysis rationale.
pub const MAX_RATIONALE_LEN: usize = 200;

/// Where a raw item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// An RSS feed fetched over HTTP.
    Rss,
    /// A local JSON dump of items.
    #[default]
    File,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Rss => write!(f, "rss"),
            Origin::File => write!(f, "file"),
        }
    }
}

/// A news item as delivered by a source, before any analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    /// Headline. Identity of the item for deduplication.
    pub title: String,
    /// Body or summary text, may be empty.
    #[serde(default)]
    pub body: String,
    /// When the item was published upstream.
    pub published_at: DateTime<Utc>,
    /// Link to the original article.
    #[serde(default)]
    pub url: String,
    /// Source tag.
    #[serde(default)]
    pub origin: Origin,
}

/// Kind of market event a news item describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Earnings,
    Order,
    Regulatory,
    Macro,
    Other,
}

impl EventCategory {
    /// Parse a model-supplied tag. Unrecognized tags fall back to `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "earnings" => EventCategory::Earnings,
            "order" => EventCategory::Order,
            "regulatory" => EventCategory::Regulatory,
            "macro" => EventCategory::Macro,
            _ => EventCategory::Other,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCategory::Earnings => write!(f, "Earnings"),
            EventCategory::Order => write!(f, "Order"),
            EventCategory::Regulatory => write!(f, "Regulatory"),
            EventCategory::Macro => write!(f, "Macro"),
            EventCategory::Other => write!(f, "Other"),
        }
    }
}

/// Expected intraday price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Enumeration order. Also the tie-break order for dominant direction.
    pub const ALL: [Direction; 3] = [Direction::Bullish, Direction::Bearish, Direction::Neutral];

    /// Parse a model-supplied tag. Unrecognized tags fall back to `Neutral`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "BULLISH" => Direction::Bullish,
            "BEARISH" => Direction::Bearish,
            _ => Direction::Neutral,
        }
    }

    /// Returns an emoji representation of the direction.
    pub fn emoji(&self) -> &'static str {
        match self {
            Direction::Bullish => "🟢",
            Direction::Bearish => "🔴",
            Direction::Neutral => "⚪",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "BULLISH"),
            Direction::Bearish => write!(f, "BEARISH"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Coarse watchlist priority derived from the average bias score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Bucket a score: `>= high` is High, `>= medium` is Medium, else Low.
    pub fn from_score(score: f64, high: f64, medium: f64) -> Self {
        if score >= high {
            Priority::High
        } else if score >= medium {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// Unvalidated analysis fields as returned by a model provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPayload {
    pub symbol: String,
    pub event_category: String,
    pub direction: String,
    pub impact_strength: i64,
    pub confidence: f64,
    pub rationale: String,
}

/// Result of one call to an analysis adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The item does not concern an identifiable instrument.
    NoSymbol,
    /// The model returned a structured analysis.
    Success(AnalysisPayload),
    /// Transport error, timeout or malformed payload.
    Failure { reason: String },
}

impl AnalysisOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        AnalysisOutcome::Failure {
            reason: reason.into(),
        }
    }
}

/// A validated analysis of a single news item.
///
/// The bias score is not stored; it is always derived from
/// `impact_strength * confidence`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedItem {
    pub id: Uuid,
    /// Uppercase instrument code, at most 20 chars.
    pub symbol: String,
    pub event_category: EventCategory,
    pub direction: Direction,
    /// 1..=5
    pub impact_strength: u8,
    /// 0.0..=1.0
    pub confidence: f64,
    /// At most 200 chars.
    pub rationale: String,
    pub source_published_at: DateTime<Utc>,
}

impl AnalyzedItem {
    /// Validate a provider payload against the item it was produced for.
    ///
    /// Soft-invalid fields are normalized: unknown tags fall back to
    /// `Other`/`Neutral`, numbers are clamped into range and strings are
    /// truncated. Returns `None` when no usable symbol remains.
    pub fn from_payload(payload: AnalysisPayload, item: &RawItem) -> Option<Self> {
        let symbol = normalize_symbol(&payload.symbol)?;

        Some(Self {
            id: Uuid::new_v4(),
            symbol,
            event_category: EventCategory::from_tag(&payload.event_category),
            direction: Direction::from_tag(&payload.direction),
            impact_strength: payload.impact_strength.clamp(1, 5) as u8,
            confidence: clamp_confidence(payload.confidence),
            rationale: truncate_chars(payload.rationale.trim(), MAX_RATIONALE_LEN),
            source_published_at: item.published_at,
        })
    }

    /// `impact_strength * confidence`, in 0.0..=5.0.
    pub fn bias_score(&self) -> f64 {
        f64::from(self.impact_strength) * self.confidence
    }
}

/// Uppercase, trim and cap a symbol. Empty and "null" symbols yield `None`.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(truncate_chars(&trimmed.to_uppercase(), MAX_SYMBOL_LEN))
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Truncate to at most `max` chars without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// One ranked symbol on the watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub symbol: String,
    /// Dominant direction, never `Neutral`.
    pub direction: Direction,
    /// Never `Low`.
    pub priority: Priority,
    /// Average bias score over the contributing analyses.
    pub bias_score: f64,
    /// Rationale of the strongest contributing analysis.
    pub reason: String,
    pub news_count: usize,
    #[serde(rename = "latestNewsDatetime")]
    pub latest_published_at: DateTime<Utc>,
    /// Run date in the reporting timezone.
    #[serde(rename = "date")]
    pub as_of_date: NaiveDate,
}

/// Counters describing one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    /// Run timestamp in the reporting timezone.
    pub generated_at: DateTime<FixedOffset>,
    /// Items returned by the source.
    pub total_news_fetched: usize,
    /// Items left after deduplication.
    pub total_unique: usize,
    /// Items that produced a validated analysis.
    pub total_analyzed: usize,
    /// Items the model could not attribute to a symbol.
    pub total_no_symbol: usize,
    /// Items whose analysis failed or timed out.
    pub total_failed: usize,
    pub watchlist_size: usize,
    pub bullish_count: usize,
    pub bearish_count: usize,
}

impl RunMetadata {
    /// Metadata with every counter at zero.
    pub fn empty(generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            generated_at,
            total_news_fetched: 0,
            total_unique: 0,
            total_analyzed: 0,
            total_no_symbol: 0,
            total_failed: 0,
            watchlist_size: 0,
            bullish_count: 0,
            bearish_count: 0,
        }
    }
}

/// The complete output of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistResult {
    /// Ranked by descending bias score.
    pub watchlist: Vec<WatchlistEntry>,
    pub bullish_stocks: Vec<WatchlistEntry>,
    pub bearish_stocks: Vec<WatchlistEntry>,
    pub metadata: RunMetadata,
}

impl WatchlistResult {
    /// A well-formed result with no entries.
    pub fn empty(metadata: RunMetadata) -> Self {
        Self {
            watchlist: Vec::new(),
            bullish_stocks: Vec::new(),
            bearish_stocks: Vec::new(),
            metadata,
        }
    }
}
