//! Watchlist report generation.
//!
//! JSON is the machine contract; Markdown is for people.

use crate::models::{Direction, RunMetadata, WatchlistEntry, WatchlistResult};
use anyhow::{Context, Result};
use std::io::Write;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(result: &WatchlistResult) -> String {
    let mut output = String::new();

    output.push_str("# Stock Watchlist\n\n");
    output.push_str(&generate_metadata_section(&result.metadata));

    if result.watchlist.is_empty() {
        output.push_str("No stocks qualified for the watchlist in this run.\n\n");
    } else {
        output.push_str(&generate_direction_section(
            Direction::Bullish,
            &result.bullish_stocks,
        ));
        output.push_str(&generate_direction_section(
            Direction::Bearish,
            &result.bearish_stocks,
        ));
        output.push_str(&generate_ranked_section(&result.watchlist));
    }

    output.push_str(&generate_footer());
    output
}

fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated At:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S %:z")
    ));
    section.push_str(&format!(
        "- **News Fetched:** {} ({} unique)\n",
        metadata.total_news_fetched, metadata.total_unique
    ));
    section.push_str(&format!("- **Analyzed:** {}\n", metadata.total_analyzed));
    if metadata.total_no_symbol > 0 {
        section.push_str(&format!(
            "- **No Stock Identified:** {}\n",
            metadata.total_no_symbol
        ));
    }
    if metadata.total_failed > 0 {
        section.push_str(&format!("- **Failed:** {}\n", metadata.total_failed));
    }
    section.push_str(&format!(
        "- **Watchlist Size:** {} ({} {} bullish, {} {} bearish)\n\n",
        metadata.watchlist_size,
        Direction::Bullish.emoji(),
        metadata.bullish_count,
        Direction::Bearish.emoji(),
        metadata.bearish_count
    ));

    section
}

fn generate_direction_section(direction: Direction, entries: &[WatchlistEntry]) -> String {
    let title = match direction {
        Direction::Bullish => "Bullish",
        Direction::Bearish => "Bearish",
        Direction::Neutral => "Neutral",
    };

    let mut section = format!("## {} {}\n\n", direction.emoji(), title);
    if entries.is_empty() {
        section.push_str(&format!("No {} stocks.\n\n", title.to_lowercase()));
        return section;
    }

    section.push_str("| Symbol | Priority | Bias Score | News | Reason |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---|\n");
    for entry in entries {
        section.push_str(&format!(
            "| **{}** | {} | {:.2} | {} | {} |\n",
            entry.symbol,
            entry.priority,
            entry.bias_score,
            entry.news_count,
            escape_cell(&entry.reason)
        ));
    }
    section.push('\n');

    section
}

fn generate_ranked_section(entries: &[WatchlistEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Ranked Watchlist\n\n");
    section.push_str("| # | Symbol | Direction | Priority | Bias Score | News | Latest News |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|:---|\n");
    for (i, entry) in entries.iter().enumerate() {
        section.push_str(&format!(
            "| {} | **{}** | {} {} | {} | {:.2} | {} | {} |\n",
            i + 1,
            entry.symbol,
            entry.direction.emoji(),
            entry.direction,
            entry.priority,
            entry.bias_score,
            entry.news_count,
            entry.latest_published_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated by newswatch v{}. Not investment advice.*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Pipes would break the table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(result: &WatchlistResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}

/// Write a rendered report to `output`, or to stdout when it is `-`.
pub fn write_report(content: &str, output: &str) -> Result<()> {
    if output == "-" {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(content.as_bytes())
            .context("Failed to write report to stdout")?;
        if !content.ends_with('\n') {
            handle.write_all(b"\n")?;
        }
        return Ok(());
    }

    std::fs::write(output, content).with_context(|| format!("Failed to write report to {}", output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    fn entry(symbol: &str, direction: Direction, bias_score: f64, reason: &str) -> WatchlistEntry {
        WatchlistEntry {
            symbol: symbol.to_string(),
            direction,
            priority: Priority::from_score(bias_score, 2.5, 1.5),
            bias_score,
            reason: reason.to_string(),
            news_count: 2,
            latest_published_at: Utc.with_ymd_and_hms(2026, 10, 19, 4, 0, 0).unwrap(),
            as_of_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        }
    }

    fn create_test_result() -> WatchlistResult {
        let generated_at = FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 9, 30, 0)
            .unwrap();
        let reliance = entry("RELIANCE", Direction::Bullish, 3.6, "Jio tariff hike | ARPU up");
        let vedl = entry("VEDL", Direction::Bearish, 2.0, "Dividend cut");

        let mut metadata = RunMetadata::empty(generated_at);
        metadata.total_news_fetched = 10;
        metadata.total_unique = 9;
        metadata.total_analyzed = 6;
        metadata.total_no_symbol = 2;
        metadata.total_failed = 1;
        metadata.watchlist_size = 2;
        metadata.bullish_count = 1;
        metadata.bearish_count = 1;

        WatchlistResult {
            watchlist: vec![reliance.clone(), vedl.clone()],
            bullish_stocks: vec![reliance],
            bearish_stocks: vec![vedl],
            metadata,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_result());

        assert!(markdown.contains("# Stock Watchlist"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("2026-10-19 09:30:00 +05:30"));
        assert!(markdown.contains("- **News Fetched:** 10 (9 unique)"));
        assert!(markdown.contains("- **Failed:** 1"));
        assert!(markdown.contains("## 🟢 Bullish"));
        assert!(markdown.contains("## 🔴 Bearish"));
        assert!(markdown.contains("## Ranked Watchlist"));
        assert!(markdown.contains("| **RELIANCE** | HIGH | 3.60 | 2 | Jio tariff hike \\| ARPU up |"));
        assert!(markdown.contains("| 2 | **VEDL** | 🔴 BEARISH | MEDIUM | 2.00 |"));
    }

    #[test]
    fn test_markdown_empty_watchlist() {
        let mut result = create_test_result();
        result.watchlist.clear();
        result.bullish_stocks.clear();
        result.bearish_stocks.clear();

        let markdown = generate_markdown_report(&result);
        assert!(markdown.contains("No stocks qualified"));
        assert!(!markdown.contains("## Ranked Watchlist"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["watchlist"][0]["symbol"], "RELIANCE");
        assert_eq!(value["watchlist"][0]["direction"], "BULLISH");
        assert_eq!(value["bearishStocks"][0]["symbol"], "VEDL");
        assert_eq!(value["metadata"]["totalNewsFetched"], 10);
        assert_eq!(value["metadata"]["totalFailed"], 1);
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let path_str = path.to_str().unwrap();

        write_report("{}", path_str).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        assert!(write_report("{}", "/nonexistent/dir/watchlist.json").is_err());
    }
}
