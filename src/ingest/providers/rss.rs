// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::{http_client, parse_rfc2822, url_digest};
use crate::ingest::normalize_text;
use crate::ingest::types::{Candidate, Category, SourceProvider};

const SUMMARY_MAX_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

pub struct RssProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: http_client(),
            },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<Candidate>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let (Some(title), Some(link)) = (it.title, it.link) else {
                continue;
            };
            let title = normalize_text(&title, SUMMARY_MAX_CHARS);
            if title.is_empty() {
                continue;
            }

            let description = it.description.unwrap_or_default();
            let image_url = it
                .enclosure
                .and_then(|e| e.url)
                .or_else(|| first_img_src(&description));

            out.push(Candidate {
                id: format!("rss-{}", url_digest(&link)),
                title,
                summary: normalize_text(&description, SUMMARY_MAX_CHARS),
                published_at: it
                    .pub_date
                    .as_deref()
                    .map(parse_rfc2822)
                    .unwrap_or_else(chrono::Utc::now),
                source_url: link,
                category: Category::Feed,
                image_url,
                full_body: None,
            });
        }

        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("rss http get()")?
                    .error_for_status()
                    .context("rss http status")?
                    .text()
                    .await
                    .context("rss http .text()")?;
                let items = Self::parse_items_from_str(&body)?;
                tracing::info!(target: "ingest", feed = %url, count = items.len(), "rss fetched");
                Ok(items)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn first_img_src(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_IMG.get_or_init(|| regex::Regex::new(r#"<img[^>]+src="([^"]+)""#).unwrap());
    re.captures(html).map(|c| c[1].to_string())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Feed</title>
    <item>
      <title>Binance Will List FooCoin (FOO)</title>
      <link>https://example.test/a/foo</link>
      <pubDate>Tue, 10 Jun 2025 08:00:00 +0000</pubDate>
      <description>&lt;p&gt;Trading opens&amp;nbsp;soon.&lt;/p&gt;&lt;img src="https://img.test/foo.png"&gt;</description>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <title>Maintenance notice</title>
      <link>https://example.test/a/maint</link>
      <enclosure url="https://img.test/maint.jpg" type="image/jpeg" length="1"/>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn parses_items_and_skips_linkless() {
        let p = RssProvider::from_fixture_str(FEED);
        let items = p.fetch_latest().await.unwrap();
        assert_eq!(items.len(), 2);

        let foo = &items[0];
        assert_eq!(foo.title, "Binance Will List FooCoin (FOO)");
        assert!(foo.id.starts_with("rss-"));
        assert_eq!(foo.summary, "Trading opens soon.");
        assert_eq!(foo.image_url.as_deref(), Some("https://img.test/foo.png"));
        assert_eq!(foo.published_at.timestamp(), 1_749_542_400);

        assert_eq!(items[1].image_url.as_deref(), Some("https://img.test/maint.jpg"));
    }

    #[tokio::test]
    async fn malformed_xml_is_an_error() {
        let p = RssProvider::from_fixture_str("<rss><channel>");
        assert!(p.fetch_latest().await.is_err());
    }
}
