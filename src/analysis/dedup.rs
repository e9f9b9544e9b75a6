//! Title-based deduplication of raw items.

use crate::models::RawItem;
use std::collections::HashSet;

/// Remove repeated items, keeping the first occurrence of each title.
///
/// Titles are compared byte-for-byte after trimming surrounding whitespace.
/// Case and punctuation are not normalized, so "TCS wins deal" and
/// "TCS Wins Deal" are kept as two items.
pub fn dedup_by_title(items: Vec<RawItem>) -> Vec<RawItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());

    items
        .into_iter()
        .filter(|item| seen.insert(item.title.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Origin;
    use chrono::Utc;

    fn item(title: &str) -> RawItem {
        RawItem {
            title: title.to_string(),
            body: format!("body of {}", title),
            published_at: Utc::now(),
            url: String::new(),
            origin: Origin::Rss,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_by_title(Vec::new()).is_empty());
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let mut second_a = item("A");
        second_a.body = "later copy".to_string();

        let out = dedup_by_title(vec![item("A"), item("B"), second_a, item("C"), item("B")]);

        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(out[0].body, "body of A");
    }

    #[test]
    fn test_trims_but_keeps_case_and_punctuation() {
        let out = dedup_by_title(vec![
            item("Reliance Q2 beat"),
            item("  Reliance Q2 beat\n"),
            item("reliance q2 beat"),
            item("Reliance Q2 beat!"),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_output_titles_unique() {
        let titles = ["x", "y", " x", "z", "y ", "x"];
        let input: Vec<_> = titles.iter().map(|t| item(t)).collect();
        let len_in = input.len();

        let out = dedup_by_title(input);

        assert!(out.len() <= len_in);
        let unique: HashSet<_> = out.iter().map(|i| i.title.trim()).collect();
        assert_eq!(unique.len(), out.len());
    }
}
