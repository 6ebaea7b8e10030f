// src/ingest/providers/mod.rs
pub mod announcements;
pub mod rss;
pub mod submissions;

use chrono::{DateTime, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

/// Parse an RSS `pubDate`; unparseable dates fall back to `now`.
pub(crate) fn parse_rfc2822(ts: &str) -> DateTime<Utc> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

/// Short stable id derived from a URL (first 8 bytes of SHA-256, hex).
pub(crate) fn url_digest(url: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Browser-like client; exchange sites reject default user agents.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36")
        .connect_timeout(std::time::Duration::from_secs(5))
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .unwrap_or_default()
}
