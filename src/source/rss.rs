//! RSS 2.0 feed source.

use crate::error::SourceError;
use crate::models::{Origin, RawItem};
use crate::source::{collapse_whitespace, NewsSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Zerodha Pulse aggregated Indian market news.
pub const DEFAULT_FEED_URL: &str = "https://pulse.zerodha.com/feed.php";

/// Descriptions shorter than this are replaced by the title.
const MIN_DESCRIPTION_CHARS: usize = 20;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Fetches one or more RSS feeds over HTTP.
pub struct RssSource {
    feed_urls: Vec<String>,
    max_items: usize,
    client: reqwest::Client,
}

impl RssSource {
    pub fn new(
        feed_urls: Vec<String>,
        max_items: usize,
        timeout_seconds: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("newswatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            feed_urls,
            max_items,
            client,
        })
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<RawItem>, SourceError> {
        info!("Fetching RSS feed from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;

        parse_feed(&body, url, self.max_items)
    }
}

#[async_trait]
impl NewsSource for RssSource {
    async fn fetch(&self) -> Result<Vec<RawItem>, SourceError> {
        let mut items = Vec::new();
        let mut failures = 0;

        for url in &self.feed_urls {
            match self.fetch_feed(url).await {
                Ok(feed_items) => {
                    info!("Fetched {} items from {}", feed_items.len(), url);
                    items.extend(feed_items);
                }
                Err(e) => {
                    warn!("Error fetching {}: {}", url, e);
                    failures += 1;
                }
            }
        }

        if failures > 0 && failures == self.feed_urls.len() {
            return Err(SourceError::AllFeedsFailed(failures));
        }

        items.truncate(self.max_items);
        Ok(items)
    }

    fn name(&self) -> &str {
        "rss"
    }
}

/// Parse an RSS document into raw items, keeping at most `max_items`.
///
/// Entries without a title or link are skipped. A missing or unparsable
/// `pubDate` falls back to the current time.
pub fn parse_feed(xml: &str, url: &str, max_items: usize) -> Result<Vec<RawItem>, SourceError> {
    let cleaned = xml.replace("&nbsp;", " ");
    let rss: Rss = from_str(&cleaned).map_err(|e| SourceError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    debug!("Found {} entries in {}", rss.channel.items.len(), url);

    let mut out = Vec::new();
    for entry in rss.channel.items.into_iter().take(max_items) {
        let title = collapse_whitespace(entry.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            continue;
        }

        let link = entry.link.as_deref().unwrap_or_default().trim().to_string();
        if link.is_empty() {
            debug!("No link for entry: {}", title);
            continue;
        }

        let description =
            collapse_whitespace(&strip_tags(entry.description.as_deref().unwrap_or_default()));
        let body = if description.chars().count() < MIN_DESCRIPTION_CHARS {
            title.clone()
        } else {
            format!("{}. {}", title, description)
        };

        let published_at = entry
            .pub_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc2822(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        out.push(RawItem {
            title,
            body,
            published_at,
            url: link,
            origin: Origin::Rss,
        });
    }

    Ok(out)
}

/// Drop anything between `<` and `>`.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Pulse</title>
    <link>https://pulse.zerodha.com</link>
    <item>
      <title>Tata Motors Q2 profit jumps 40%</title>
      <link>https://news.example/tata</link>
      <pubDate>Mon, 19 Oct 2026 09:30:00 +0530</pubDate>
      <description><![CDATA[<p>Strong JLR volumes lift&nbsp;margins across segments.</p>]]></description>
    </item>
    <item>
      <title>  Short   one </title>
      <link>https://news.example/short</link>
      <description>tiny</description>
    </item>
    <item>
      <title>No link here</title>
      <description>Should be skipped because there is no link.</description>
    </item>
    <item>
      <title></title>
      <link>https://news.example/empty</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let items = parse_feed(FEED, "test", 10).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Tata Motors Q2 profit jumps 40%");
        assert!(items[0].body.starts_with("Tata Motors Q2 profit jumps 40%. Strong JLR volumes"));
        assert_eq!(
            items[0].published_at,
            Utc.with_ymd_and_hms(2026, 10, 19, 4, 0, 0).unwrap()
        );
        assert_eq!(items[0].origin, Origin::Rss);

        assert_eq!(items[1].title, "Short one");
        assert_eq!(items[1].body, "Short one");
    }

    #[test]
    fn test_parse_feed_caps_entries() {
        let items = parse_feed(FEED, "test", 1).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed("<html>not a feed", "test", 10),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(collapse_whitespace(&strip_tags("<b>Bold</b> text")), "Bold text");
    }

    #[tokio::test]
    async fn test_all_feeds_failing_is_an_error() {
        let source = RssSource::new(vec!["http://127.0.0.1:9/feed".to_string()], 10, 2).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::AllFeedsFailed(1))
        ));
    }

    #[tokio::test]
    async fn test_no_feeds_is_empty() {
        let source = RssSource::new(Vec::new(), 10, 2).unwrap();
        assert!(source.fetch().await.unwrap().is_empty());
    }
}
