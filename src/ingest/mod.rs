// src/ingest/mod.rs
pub mod enrich;
pub mod providers;
pub mod types;

use crate::ingest::types::{Candidate, SourceProvider};
use crate::ledger::title_key;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "herald_candidates_fetched_total",
            "Candidates returned by all sources, after in-batch title dedup."
        );
        describe_counter!(
            "herald_source_errors_total",
            "Source fetch/parse errors (source treated as empty)."
        );
        describe_histogram!("herald_fetch_ms", "Per-source fetch time in milliseconds.");
    });
}

/// Strip tags, decode entities, unify quotes and collapse whitespace.
/// Output is capped at `max_chars` characters.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) Strip HTML tags (before decoding so encoded `&lt;` survives as text)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let mut out = re_tags.replace_all(s, " ").to_string();

    // 2) HTML entity decode
    out = html_escape::decode_html_entities(&out).to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }

    out
}

/// Drop later candidates whose [`title_key`] was already seen in this batch,
/// so the in-batch rule matches the ledger's cross-cycle one. First occurrence
/// wins, order is preserved.
pub fn dedup_by_title(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(title_key(&c.title)))
        .collect()
}

/// Fetch from every provider in order. A failing provider contributes nothing
/// and never aborts the others.
pub async fn fetch_all(providers: &[Box<dyn SourceProvider>]) -> Vec<Candidate> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        let t0 = std::time::Instant::now();
        match p.fetch_latest().await {
            Ok(mut v) => {
                tracing::debug!(target: "ingest", source = p.name(), count = v.len(), "source fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = p.name(), "source error");
                counter!("herald_source_errors_total", "source" => p.name()).increment(1);
            }
        }
        metrics::histogram!("herald_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    }

    let all = dedup_by_title(raw);
    counter!("herald_candidates_fetched_total").increment(all.len() as u64);
    tracing::info!(target: "ingest", total = all.len(), "unique candidates fetched");
    all
}
