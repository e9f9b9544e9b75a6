//! Ranking and truncation of watchlist candidates.

use crate::models::{Direction, WatchlistEntry};
use std::cmp::Ordering;

/// Default maximum watchlist size.
pub const DEFAULT_MAX_WATCHLIST_SIZE: usize = 10;

/// Ranked watchlist with direction views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Descending bias score, at most `max_size` entries.
    pub ranked: Vec<WatchlistEntry>,
    pub bullish: Vec<WatchlistEntry>,
    pub bearish: Vec<WatchlistEntry>,
}

/// Sort by bias score (highest first), keep the top `max_size` and split
/// by direction. Equal scores keep their incoming order.
pub fn rank(mut entries: Vec<WatchlistEntry>, max_size: usize) -> Ranking {
    // `sort_by` is stable.
    entries.sort_by(|a, b| {
        b.bias_score
            .partial_cmp(&a.bias_score)
            .unwrap_or(Ordering::Equal)
    });
    entries.truncate(max_size);

    let bullish = filter_direction(&entries, Direction::Bullish);
    let bearish = filter_direction(&entries, Direction::Bearish);

    Ranking {
        ranked: entries,
        bullish,
        bearish,
    }
}

fn filter_direction(entries: &[WatchlistEntry], direction: Direction) -> Vec<WatchlistEntry> {
    entries
        .iter()
        .filter(|e| e.direction == direction)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{NaiveDate, Utc};

    fn entry(symbol: &str, direction: Direction, bias_score: f64) -> WatchlistEntry {
        WatchlistEntry {
            symbol: symbol.to_string(),
            direction,
            priority: Priority::from_score(bias_score, 2.5, 1.5),
            bias_score,
            reason: format!("{} reason", symbol),
            news_count: 1,
            latest_published_at: Utc::now(),
            as_of_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        }
    }

    #[test]
    fn test_sorted_descending() {
        let ranking = rank(
            vec![
                entry("A", Direction::Bullish, 1.6),
                entry("B", Direction::Bearish, 4.2),
                entry("C", Direction::Bullish, 2.9),
            ],
            10,
        );

        let symbols: Vec<_> = ranking.ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_truncates_to_top_scores() {
        let entries: Vec<_> = (0..12)
            .map(|i| entry(&format!("S{:02}", i), Direction::Bullish, 1.5 + i as f64 * 0.25))
            .collect();

        let ranking = rank(entries, 10);

        assert_eq!(ranking.ranked.len(), 10);
        assert_eq!(ranking.ranked[0].symbol, "S11");
        assert_eq!(ranking.ranked[9].symbol, "S02");
        assert!(ranking
            .ranked
            .windows(2)
            .all(|w| w[0].bias_score >= w[1].bias_score));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranking = rank(
            vec![
                entry("AAA", Direction::Bullish, 3.0),
                entry("BBB", Direction::Bearish, 3.0),
                entry("CCC", Direction::Bullish, 3.0),
                entry("DDD", Direction::Bullish, 4.0),
            ],
            3,
        );

        let symbols: Vec<_> = ranking.ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["DDD", "AAA", "BBB"]);
    }

    #[test]
    fn test_partition_keeps_primary_list() {
        let ranking = rank(
            vec![
                entry("UP", Direction::Bullish, 3.0),
                entry("DOWN", Direction::Bearish, 2.0),
                entry("UP2", Direction::Bullish, 1.8),
            ],
            10,
        );

        assert_eq!(ranking.ranked.len(), 3);
        assert_eq!(ranking.bullish.len(), 2);
        assert_eq!(ranking.bearish.len(), 1);
        assert_eq!(ranking.bullish[0].symbol, "UP");
        assert_eq!(ranking.bearish[0].symbol, "DOWN");
    }
}
