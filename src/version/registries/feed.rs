//! Packagist vendor RSS feed, used as a cheap "what changed since" probe

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::ReleaseFeed;
use crate::version::types::Announcement;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    guid: Option<Guid>,
}

/// `<guid isPermaLink="false">…</guid>` carries attributes, so only its text is kept
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Release feed backed by `/feeds/vendor.<vendor>.rss`
pub struct PackagistFeed {
    client: reqwest::Client,
    base_url: String,
    title_re: Regex,
}

impl PackagistFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent("update-watch")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            title_re: Regex::new(r"(.*?)\s+\((.*?)\)").unwrap(),
        })
    }

    /// Parse an RSS document into announcements, oldest first.
    /// Items without a `name (version)` title or a valid pubDate are skipped.
    pub fn parse_feed(&self, xml: &str) -> Result<Vec<Announcement>, RegistryError> {
        let rss: Rss =
            quick_xml::de::from_str(xml).map_err(|e| RegistryError::Parse(e.to_string()))?;

        let mut announcements: Vec<Announcement> = rss
            .channel
            .items
            .into_iter()
            .filter_map(|item| self.to_announcement(item))
            .collect();

        announcements.sort_by(|a, b| a.published_at.cmp(&b.published_at));

        Ok(announcements)
    }

    fn to_announcement(&self, item: FeedItem) -> Option<Announcement> {
        let title = item.title?.trim().to_string();
        let captures = self.title_re.captures(&title)?;
        let name = captures.get(1)?.as_str().trim().to_string();
        let version = captures.get(2)?.as_str().trim().to_string();

        let published_at = match item
            .pub_date
            .as_deref()
            .map(|d| DateTime::parse_from_rfc2822(d.trim()))
        {
            Some(Ok(dt)) => dt.with_timezone(&Utc),
            _ => {
                debug!("Skipping feed item without valid pubDate: {}", title);
                return None;
            }
        };

        Some(Announcement {
            name,
            version,
            description: item.description.unwrap_or_default().trim().to_string(),
            link: item.link.map(|l| l.trim().to_string()),
            guid: item.guid.map(|g| g.value.trim().to_string()),
            title,
            published_at,
        })
    }
}

#[async_trait::async_trait]
impl ReleaseFeed for PackagistFeed {
    async fn announcements_since(
        &self,
        vendor: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, RegistryError> {
        let url = format!("{}/feeds/vendor.{}.rss", self.base_url, vendor);
        debug!("Fetching release feed: {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(vendor.to_string()));
        }

        if !status.is_success() {
            warn!("Release feed returned status {}: {}", status, url);
            return Err(RegistryError::Parse(format!("Unexpected status: {}", status)));
        }

        let body = response.text().await?;

        let announcements: Vec<Announcement> = self
            .parse_feed(&body)?
            .into_iter()
            .filter(|a| a.published_at > since)
            .collect();

        debug!(
            "Found {} announcements for {} since {}",
            announcements.len(),
            vendor,
            since
        );

        Ok(announcements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Server;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Newly released packages from infrangible</title>
    <link>https://packagist.org/</link>
    <description>Latest packages</description>
    <item>
      <title>infrangible/m2-seo (2.1.0)</title>
      <description><![CDATA[SEO helpers]]></description>
      <pubDate>Tue, 05 Mar 2024 10:00:00 +0000</pubDate>
      <link>https://packagist.org/packages/infrangible/m2-seo</link>
      <guid isPermaLink="false">infrangible/m2-seo 2.1.0</guid>
    </item>
    <item>
      <title>infrangible/m2-core (1.4.0)</title>
      <description>Core</description>
      <pubDate>Fri, 01 Mar 2024 08:30:00 +0000</pubDate>
      <link>https://packagist.org/packages/infrangible/m2-core</link>
      <guid>infrangible/m2-core 1.4.0</guid>
    </item>
    <item>
      <title>not a release title</title>
      <pubDate>Fri, 01 Mar 2024 09:00:00 +0000</pubDate>
    </item>
    <item>
      <title>infrangible/m2-cms (1.0.0)</title>
      <pubDate>someday</pubDate>
    </item>
  </channel>
</rss>"#;

    fn feed(url: &str) -> PackagistFeed {
        PackagistFeed::new(url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn parse_feed_extracts_name_and_version_oldest_first() {
        let result = feed("http://localhost").parse_feed(FEED).unwrap();

        assert_eq!(
            result,
            vec![
                Announcement {
                    name: "infrangible/m2-core".to_string(),
                    version: "1.4.0".to_string(),
                    title: "infrangible/m2-core (1.4.0)".to_string(),
                    description: "Core".to_string(),
                    link: Some("https://packagist.org/packages/infrangible/m2-core".to_string()),
                    guid: Some("infrangible/m2-core 1.4.0".to_string()),
                    published_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
                },
                Announcement {
                    name: "infrangible/m2-seo".to_string(),
                    version: "2.1.0".to_string(),
                    title: "infrangible/m2-seo (2.1.0)".to_string(),
                    description: "SEO helpers".to_string(),
                    link: Some("https://packagist.org/packages/infrangible/m2-seo".to_string()),
                    guid: Some("infrangible/m2-seo 2.1.0".to_string()),
                    published_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
                },
            ]
        );
    }

    #[test]
    fn parse_feed_accepts_channel_without_items() {
        let xml = r#"<rss version="2.0"><channel><title>empty</title></channel></rss>"#;

        let result = feed("http://localhost").parse_feed(xml).unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn parse_feed_rejects_malformed_xml() {
        let result = feed("http://localhost").parse_feed("<rss><channel>");

        assert!(matches!(result, Err(RegistryError::Parse(_))));
    }

    #[tokio::test]
    async fn announcements_since_filters_by_cursor() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/feeds/vendor.infrangible.rss")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let since = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let result = feed(&server.url())
            .announcements_since("infrangible", since)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "infrangible/m2-seo");
        assert_eq!(result[0].version, "2.1.0");
    }

    #[tokio::test]
    async fn announcements_since_excludes_items_published_exactly_at_cursor() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/feeds/vendor.infrangible.rss")
            .with_status(200)
            .with_body(FEED)
            .create_async()
            .await;

        let since = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let result = feed(&server.url())
            .announcements_since("infrangible", since)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn announcements_since_returns_not_found_for_unknown_vendor() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/feeds/vendor.nobody.rss")
            .with_status(404)
            .create_async()
            .await;

        let result = feed(&server.url())
            .announcements_since("nobody", DateTime::<Utc>::UNIX_EPOCH)
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }
}
