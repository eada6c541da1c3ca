use std::time::Duration;

use feed_rs::model::Feed;
use feed_rs::parser;
use futures::future::BoxFuture;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::error::Result;
use crate::models::{NewSource, NewSourceItem, Source};
use crate::services::SourceIngest;

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("insight-beam/0.1")
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch_feed(&self, url: &str, limit: Option<usize>) -> Result<Vec<NewSourceItem>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        parse_items(&bytes, limit)
    }

    /// Discover a feed from a URL.
    /// A direct RSS/Atom URL is parsed as-is; an HTML page is searched for
    /// `<link rel="alternate">` feed links.
    pub async fn discover_feed(&self, url: &str) -> Result<NewSource> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch URL: HTTP {}", response.status()).into());
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response.bytes().await?;

        if let Ok(feed) = parser::parse(&bytes[..]) {
            return Ok(source_from_feed(feed, final_url));
        }

        if content_type.contains("html") || bytes.starts_with(b"<!") || bytes.starts_with(b"<html") {
            let html = String::from_utf8_lossy(&bytes);
            if let Some(feed_url) = find_feed_link(&html, &final_url) {
                let feed_response = self.client.get(&feed_url).send().await?;
                if feed_response.status().is_success() {
                    let feed_bytes = feed_response.bytes().await?;
                    let feed = parser::parse(&feed_bytes[..])?;
                    return Ok(source_from_feed(feed, feed_url));
                }
            }
        }

        Err(anyhow::anyhow!("Could not find RSS/Atom feed at this URL").into())
    }
}

impl SourceIngest for FeedFetcher {
    fn add_source(&self, url: Url) -> BoxFuture<'_, Result<NewSource>> {
        Box::pin(async move { self.discover_feed(url.as_str()).await })
    }

    fn pull(&self, source: Source, limit: Option<usize>) -> BoxFuture<'_, Result<Vec<NewSourceItem>>> {
        Box::pin(async move { self.fetch_feed(&source.url, limit).await })
    }
}

fn source_from_feed(feed: Feed, url: String) -> NewSource {
    NewSource {
        title: feed
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled Feed".to_string()),
        url,
        image_url: feed
            .logo
            .map(|img| img.uri)
            .or_else(|| feed.icon.map(|img| img.uri)),
        last_build: feed.updated,
        pub_date: feed.published,
    }
}

fn parse_items(bytes: &[u8], limit: Option<usize>) -> Result<Vec<NewSourceItem>> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|entry| {
            // Try content first, then fall back to summary
            let html = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();

            NewSourceItem {
                title: entry
                    .title
                    .map(|t| t.content)
                    .unwrap_or_else(|| "Untitled".to_string()),
                content: html_to_text(&html),
                url: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
                posted: entry.published.or(entry.updated),
                updated: entry.updated,
                authors: entry.authors.into_iter().map(|a| a.name).collect(),
            }
        })
        .collect();

    Ok(items)
}

fn html_to_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), 100) {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            html.to_string()
        }
    }
}

/// Search HTML for RSS/Atom feed links
fn find_feed_link(html: &str, base_url: &str) -> Option<String> {
    // <link rel="alternate" type="application/rss+xml" href="...">
    let link_re = Regex::new(
        r#"<link[^>]*rel=["']alternate["'][^>]*type=["']application/(rss|atom)\+xml["'][^>]*href=["']([^"']+)["']"#,
    )
    .ok()?;

    // Also try type without rel
    let link_re2 = Regex::new(
        r#"<link[^>]*type=["']application/(rss|atom)\+xml["'][^>]*href=["']([^"']+)["']"#,
    )
    .ok()?;

    let href = link_re
        .captures(html)
        .or_else(|| link_re2.captures(html))
        .and_then(|cap| cap.get(2))
        .map(|m| m.as_str().to_string())?;

    Some(resolve_url(&href, base_url))
}

/// Resolve a potentially relative URL against a base URL
fn resolve_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://news.example.com</link>
    <description>Example</description>
    <item>
      <title>First story</title>
      <link>https://news.example.com/first</link>
      <description>&lt;p&gt;Hello &lt;b&gt;world&lt;/b&gt;&lt;/p&gt;</description>
      <author>reporter@example.com (Jane Doe)</author>
      <pubDate>Tue, 18 Apr 2023 18:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second story</title>
      <link>https://news.example.com/second</link>
      <description>Plain text</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_with_text_content() {
        let items = parse_items(RSS.as_bytes(), None).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First story");
        assert_eq!(items[0].url, "https://news.example.com/first");
        assert!(items[0].content.contains("Hello"));
        assert!(!items[0].content.contains("<p>"));
        assert!(items[0].posted.is_some());
        assert!(items[1].posted.is_none());
    }

    #[test]
    fn respects_pull_limit() {
        let items = parse_items(RSS.as_bytes(), Some(1)).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn finds_relative_feed_link() {
        let html = r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head></html>"#;
        assert_eq!(
            find_feed_link(html, "https://blog.example.com/posts/").as_deref(),
            Some("https://blog.example.com/feed.xml")
        );
    }

    #[test]
    fn feed_metadata_becomes_new_source() {
        let feed = parser::parse(RSS.as_bytes()).unwrap();
        let source = source_from_feed(feed, "https://news.example.com/rss".to_string());
        assert_eq!(source.title, "Example News");
        assert_eq!(source.url, "https://news.example.com/rss");
    }
}
