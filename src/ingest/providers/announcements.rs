// src/ingest/providers/announcements.rs
//! Exchange announcement catalog (JSON). More reliable than the RSS feed for
//! new listings, so its items are merged first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http_client;
use crate::ingest::normalize_text;
use crate::ingest::types::{Candidate, Category, SourceProvider};

const ANNOUNCEMENT_BASE: &str = "https://www.binance.com/en/support/announcement";

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(default)]
    catalogs: Vec<Catalog>,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    id: u64,
    code: String,
    title: String,
    body: Option<String>,
    release_date: i64,
}

pub struct AnnouncementsProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl AnnouncementsProvider {
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

    fn parse(s: &str) -> Result<Vec<Candidate>> {
        let env: Envelope = serde_json::from_str(s).context("parsing announcements json")?;
        let articles = env
            .data
            .and_then(|d| d.catalogs.into_iter().next())
            .map(|c| c.articles)
            .unwrap_or_default();

        Ok(articles
            .into_iter()
            .map(|a| Candidate {
                id: format!("binance-{}", a.id),
                title: a.title,
                source_url: format!("{ANNOUNCEMENT_BASE}/{}", a.code),
                summary: a
                    .body
                    .as_deref()
                    .map(|b| normalize_text(b, 300))
                    .unwrap_or_default(),
                published_at: DateTime::from_timestamp_millis(a.release_date).unwrap_or_else(Utc::now),
                category: Category::Listing,
                image_url: None,
                full_body: None,
            })
            .collect())
    }
}

#[async_trait]
impl SourceProvider for AnnouncementsProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .header("Accept", "application/json")
                    .send()
                    .await
                    .context("announcements http get()")?
                    .error_for_status()
                    .context("announcements http status")?
                    .text()
                    .await
                    .context("announcements http .text()")?;
                Self::parse(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "announcements"
    }
}
