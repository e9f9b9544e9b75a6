//! Error types.
//!
//! Only `ConfigError` ever stops a run. Source and analysis errors are
//! absorbed by the pipeline and surface as reduced counts.

use thiserror::Error;

/// Invalid configuration. Rejected before any network activity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    BelowOne { field: &'static str },

    #[error("thresholds must satisfy high > medium >= 0 (high = {high}, medium = {medium})")]
    Thresholds { high: f64, medium: f64 },

    #[error("invalid reporting UTC offset '{0}', expected e.g. '+05:30'")]
    UtcOffset(String),

    #[error("missing setting: {0}")]
    Missing(String),
}

/// Failure of a news source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("feed {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse feed {url}: {message}")]
    Parse { url: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid item file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("all {0} feeds failed")]
    AllFeedsFailed(usize),
}

/// Failure of a single analysis call.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),
}
