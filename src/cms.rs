// src/cms.rs
//! Stub articles on the site CMS. The stub URL is the call-to-action target
//! for every channel; when the CMS is off or fails, the site root is used.

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::ingest::types::Candidate;

const SLUG_MAX: usize = 60;
const SLUG_SUFFIX_LEN: usize = 6;

#[async_trait]
pub trait StubCreator: Send + Sync {
    /// Canonical URL for the candidate. Never fails; falls back to a fixed URL.
    async fn create_stub(&self, candidate: &Candidate) -> String;
}

pub struct CmsStubClient {
    http: reqwest::Client,
    site_url: String,
    secret: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StubRequest<'a> {
    title: &'a str,
    slug: &'a str,
    summary: &'a str,
    content: &'a str,
    source_url: &'a str,
    image_url: &'a str,
    category: &'a str,
    published_at: String,
}

#[derive(Deserialize)]
struct StubResponse {
    #[serde(default)]
    url: Option<String>,
}

impl CmsStubClient {
    pub fn new(site_url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    async fn post_stub(&self, c: &Candidate, secret: &str, slug: &str) -> anyhow::Result<String> {
        let body = StubRequest {
            title: &c.title,
            slug,
            summary: &c.summary,
            content: c.body_or_summary(),
            source_url: &c.source_url,
            image_url: c.image_url.as_deref().unwrap_or(""),
            category: c.category.as_str(),
            published_at: c.published_at.to_rfc3339(),
        };
        let resp = self
            .http
            .post(format!("{}/api/news", self.site_url))
            .bearer_auth(secret)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("cms HTTP {status}: {text}");
        }
        let parsed: StubResponse = resp.json().await.unwrap_or(StubResponse { url: None });
        Ok(parsed
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("{}/news/{slug}", self.site_url)))
    }
}

#[async_trait]
impl StubCreator for CmsStubClient {
    async fn create_stub(&self, c: &Candidate) -> String {
        let Some(secret) = self.secret.as_deref() else {
            info!(target: "cms", "cms not configured, using site root as link");
            return self.site_url.clone();
        };
        let slug = generate_slug(&c.title, &mut rand::rng());
        match self.post_stub(c, secret, &slug).await {
            Ok(url) => {
                info!(target: "cms", %url, "stub created");
                url
            }
            Err(e) => {
                warn!(target: "cms", id = %c.id, error = ?e, "stub creation failed, using site root");
                self.site_url.clone()
            }
        }
    }
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// URL-safe slug: lower-case, `[a-z0-9-]`, at most 60 chars before a random
/// 6-char suffix.
pub fn generate_slug<R: Rng>(title: &str, rng: &mut R) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    let mut base = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        if c == '-' && base.ends_with('-') {
            continue;
        }
        base.push(c);
    }
    let base: String = base.trim_matches('-').chars().take(SLUG_MAX).collect();
    let base = base.trim_end_matches('-');

    let suffix: String = (0..SLUG_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();
    format!("{base}-{suffix}")
}
