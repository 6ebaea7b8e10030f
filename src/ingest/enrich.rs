// src/ingest/enrich.rs
//! Body scraping. Never fails to the caller: on any error the candidate comes
//! back unchanged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use super::normalize_text;
use super::providers::http_client;
use super::types::Candidate;

const BODY_MAX_CHARS: usize = 2000;
const MIN_USEFUL_BODY: usize = 50;

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, candidate: Candidate) -> Candidate;
}

/// Fetches the candidate's page and extracts readable text plus `og:image`.
pub struct HttpScraper {
    client: reqwest::Client,
}

impl Default for HttpScraper {
    fn default() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl HttpScraper {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .context("scrape get()")?
            .error_for_status()
            .context("scrape status")?
            .text()
            .await
            .context("scrape .text()")
    }
}

#[async_trait]
impl Enricher for HttpScraper {
    async fn enrich(&self, mut candidate: Candidate) -> Candidate {
        let html = match self.fetch_html(&candidate.source_url).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, id = %candidate.id, "scrape failed, keeping candidate as-is");
                return candidate;
            }
        };

        let body = extract_body(&html);
        tracing::debug!(target: "ingest", id = %candidate.id, chars = body.len(), "body scraped");
        candidate.full_body = Some(body);
        if candidate.image_url.is_none() {
            candidate.image_url = extract_og_image(&html);
        }
        candidate
    }
}

/// Readable text of the first of `<article>`, `<main>`, `<body>` that yields
/// a useful amount of text, falling back to the whole document.
pub fn extract_body(html: &str) -> String {
    static RE_NOISE: OnceCell<Regex> = OnceCell::new();
    let re_noise =
        RE_NOISE.get_or_init(|| Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap());
    let cleaned = re_noise.replace_all(html, " ");

    for tag in ["article", "main", "body"] {
        let re = Regex::new(&format!(r"(?is)<{tag}[^>]*>(.*?)</{tag}>")).ok();
        if let Some(caps) = re.as_ref().and_then(|r| r.captures(&cleaned)) {
            let text = normalize_text(&caps[1], BODY_MAX_CHARS);
            if text.chars().count() >= MIN_USEFUL_BODY {
                return text;
            }
        }
    }
    normalize_text(&cleaned, BODY_MAX_CHARS)
}

pub fn extract_og_image(html: &str) -> Option<String> {
    static RE_OG: OnceCell<Regex> = OnceCell::new();
    let re = RE_OG.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#).unwrap()
    });
    re.captures(html).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <meta property="og:image" content="https://img.test/og.png">
        <script>var x = "ignore me";</script>
        </head><body><nav>Menu</nav>
        <article><h1>FooCoin</h1><p>Binance will list FooCoin and open trading for FOO/USDT pairs at 10:00 UTC.</p></article>
        </body></html>"#;

    #[test]
    fn article_text_is_preferred() {
        let body = extract_body(PAGE);
        assert!(body.starts_with("FooCoin Binance will list FooCoin"));
        assert!(!body.contains("Menu"));
        assert!(!body.contains("ignore me"));
    }

    #[test]
    fn og_image_is_found() {
        assert_eq!(extract_og_image(PAGE).as_deref(), Some("https://img.test/og.png"));
        assert_eq!(extract_og_image("<html></html>"), None);
    }

    #[test]
    fn short_article_falls_back_to_body() {
        let html = "<body><article>tiny</article><p>This page has a longer body paragraph that should be used instead.</p></body>";
        let body = extract_body(html);
        assert!(body.contains("longer body paragraph"));
    }
}
