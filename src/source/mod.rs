//! News sources.
//!
//! A source returns raw candidate items. Feed formats and transport stay
//! behind the [`NewsSource`] trait.

pub mod file;
pub mod rss;

pub use file::FileSource;
pub use rss::RssSource;

use crate::error::SourceError;
use crate::models::RawItem;
use async_trait::async_trait;

/// Retrieves raw news items.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch the current batch. May cap the number of items.
    async fn fetch(&self) -> Result<Vec<RawItem>, SourceError>;

    /// Source name for logs.
    fn name(&self) -> &str;
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
    }
}
