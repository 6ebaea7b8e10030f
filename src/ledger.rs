// src/ledger.rs
//! Deduplication ledger: which candidates have already gone through a cycle.
//!
//! Every candidate is recorded under two keys, its source `id` and a
//! normalized-title key, so the same event arriving from two sources with
//! different ids is still recognized. The whole state is a single JSON
//! document rewritten after each mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ingest::types::Candidate;

/// Prefix of title-derived keys, keeps them apart from source ids.
pub const TITLE_KEY_PREFIX: &str = "title-";
/// Number of retained `[a-z0-9]` characters in a title key. Changing this
/// changes which previously seen titles match, so it is fixed.
pub const TITLE_KEY_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenRecord {
    pub title: String,
    pub seen_at: DateTime<Utc>,
    /// Append-only `channel:timestamp` entries.
    #[serde(rename = "publishedAt", default)]
    pub publication_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    #[serde(rename = "articles", default)]
    pub records: BTreeMap<String, SeenRecord>,
    pub last_check: DateTime<Utc>,
    #[serde(default)]
    pub total_processed: u64,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            last_check: Utc::now(),
            total_processed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total_seen_keys: usize,
    pub total_processed: u64,
    pub last_check: DateTime<Utc>,
}

/// Lower-case, keep only `[a-z0-9]`, truncate to [`TITLE_KEY_LEN`].
pub fn title_key(title: &str) -> String {
    let clean: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(TITLE_KEY_LEN)
        .collect();
    format!("{TITLE_KEY_PREFIX}{clean}")
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    state: LedgerState,
}

impl Ledger {
    /// Open the ledger at `path`, starting fresh if the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load(&path);
        info!(
            target: "ledger",
            path = %path.display(),
            keys = state.records.len(),
            total_processed = state.total_processed,
            "ledger loaded"
        );
        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_new(&self, candidate: &Candidate) -> bool {
        !self.state.records.contains_key(&candidate.id)
            && !self.state.records.contains_key(&title_key(&candidate.title))
    }

    /// Candidates whose id key and title key are both absent, in input order.
    pub fn filter_new(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let total = candidates.len();
        let fresh: Vec<Candidate> = candidates.into_iter().filter(|c| self.is_new(c)).collect();
        info!(target: "ledger", total, new = fresh.len(), "filtered candidates");
        fresh
    }

    /// Record every candidate under both keys, then persist. A failed write is
    /// logged; the in-memory state still counts as seen.
    pub fn mark_seen(&mut self, candidates: &[Candidate]) {
        let now = Utc::now();
        for c in candidates {
            let record = SeenRecord {
                title: c.title.clone(),
                seen_at: now,
                publication_events: Vec::new(),
            };
            self.state.records.insert(title_key(&c.title), record.clone());
            self.state.records.insert(c.id.clone(), record);
            self.state.total_processed += 1;
        }
        self.state.last_check = now;
        self.persist();
    }

    /// Append `channel:timestamp` to the record stored under `candidate_id`.
    /// Unknown ids are ignored.
    pub fn record_publication_event(&mut self, candidate_id: &str, channel: &str) {
        let Some(record) = self.state.records.get_mut(candidate_id) else {
            return;
        };
        record
            .publication_events
            .push(format!("{channel}:{}", Utc::now().to_rfc3339()));
        self.persist();
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_seen_keys: self.state.records.len(),
            total_processed: self.state.total_processed,
            last_check: self.state.last_check,
        }
    }

    pub fn record(&self, key: &str) -> Option<&SeenRecord> {
        self.state.records.get(key)
    }

    fn persist(&self) {
        match save(&self.path, &self.state) {
            Ok(()) => metrics::gauge!("herald_ledger_keys").set(self.state.records.len() as f64),
            Err(e) => warn!(target: "ledger", error = %e, path = %self.path.display(), "could not save ledger"),
        }
    }
}

fn load(path: &Path) -> LedgerState {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return LedgerState::default(),
        Err(e) => {
            warn!(target: "ledger", error = %e, "could not read ledger, starting fresh");
            return LedgerState::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(target: "ledger", error = %e, "could not parse ledger, starting fresh");
        LedgerState::default()
    })
}

/// Whole-document write through a temp file + rename.
fn save(path: &Path, state: &LedgerState) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_vec_pretty(state).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("json.tmp");
    let mut f = std::fs::File::create(&tmp)?;
    f.write_all(&json)?;
    f.sync_all()?;
    std::fs::rename(tmp, path)?;
    Ok(())
}
