// src/relevance.rs
//! Relevance gate: maps a candidate plus an external importance score to
//! per-channel publish eligibility.
//!
//! - Telegram is never gated here (it gets everything).
//! - X requires a rating of at least [`X_THRESHOLD`].
//! - LinkedIn requires a rating of at least [`LINKEDIN_THRESHOLD`].
//! - User submissions bypass scoring entirely and unlock both.

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ingest::types::{Candidate, Category};

pub const X_THRESHOLD: u8 = 7;
pub const LINKEDIN_THRESHOLD: u8 = 8;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;
/// Rating used when the scorer fails or returns nothing usable.
pub const FALLBACK_RATING: u8 = 5;

const BYPASS_REASON: &str = "Exclusive user submission, publishing everywhere";

/// Importance of a candidate. `Bypass` sits above every rating but is never
/// equal to one, so a legitimate 10 stays distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Score {
    Rated(u8),
    Bypass,
}

impl Score {
    /// Clamp a raw scorer value into `[1, 10]`, rounding down so a rating meets
    /// a threshold only when the raw value does. Zero and non-finite values are
    /// treated as "no score" and map to the fallback rating.
    pub fn from_raw(raw: f64) -> Self {
        if !raw.is_finite() || raw == 0.0 {
            return Score::Rated(FALLBACK_RATING);
        }
        let clamped = raw.floor().clamp(f64::from(MIN_RATING), f64::from(MAX_RATING));
        Score::Rated(clamped as u8)
    }

    pub fn meets(&self, threshold: u8) -> bool {
        match self {
            Score::Rated(r) => *r >= threshold,
            Score::Bypass => true,
        }
    }

    pub fn rating(&self) -> Option<u8> {
        match self {
            Score::Rated(r) => Some(*r),
            Score::Bypass => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Rated(r) => write!(f, "{r}/10"),
            Score::Bypass => f.write_str("bypass"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelevanceVerdict {
    pub score: Score,
    pub publish_to_x: bool,
    pub publish_to_linkedin: bool,
    pub reason: String,
    pub category: Category,
}

impl RelevanceVerdict {
    /// Derive the channel flags from a rating.
    pub fn from_score(score: Score, reason: impl Into<String>, category: Category) -> Self {
        Self {
            score,
            publish_to_x: score.meets(X_THRESHOLD),
            publish_to_linkedin: score.meets(LINKEDIN_THRESHOLD),
            reason: reason.into(),
            category,
        }
    }

    pub fn bypass() -> Self {
        Self {
            score: Score::Bypass,
            publish_to_x: true,
            publish_to_linkedin: true,
            reason: BYPASS_REASON.to_string(),
            category: Category::UserSubmitted,
        }
    }

    /// Conservative verdict when scoring fails: only ungated channels publish.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            score: Score::Rated(FALLBACK_RATING),
            publish_to_x: false,
            publish_to_linkedin: false,
            reason: reason.into(),
            category: Category::Minor,
        }
    }
}

/// What an external scoring model says about a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub raw_score: f64,
    pub reason: String,
    pub category: Category,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, candidate: &Candidate) -> Result<ScoreReport>;
}

#[derive(Clone)]
pub struct RelevanceGate {
    scorer: Arc<dyn Scorer>,
}

impl RelevanceGate {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }

    pub async fn evaluate(&self, candidate: &Candidate) -> RelevanceVerdict {
        match candidate.category {
            Category::UserSubmitted => {
                info!(target: "relevance", id = %candidate.id, "user submission, bypassing scorer");
                return RelevanceVerdict::bypass();
            }
            Category::Feed
            | Category::Listing
            | Category::Partnership
            | Category::Regulatory
            | Category::Technical
            | Category::Minor => {}
        }

        match self.scorer.score(candidate).await {
            Ok(report) => {
                let score = Score::from_raw(report.raw_score);
                let reason = if report.reason.trim().is_empty() {
                    "No reason provided".to_string()
                } else {
                    report.reason
                };
                let verdict = RelevanceVerdict::from_score(score, reason, report.category);
                info!(
                    target: "relevance",
                    id = %candidate.id,
                    score = %verdict.score,
                    x = verdict.publish_to_x,
                    linkedin = verdict.publish_to_linkedin,
                    reason = %verdict.reason,
                    "scored"
                );
                verdict
            }
            Err(e) => {
                warn!(target: "relevance", error = ?e, id = %candidate.id, "scoring failed, using conservative default");
                counter!("herald_relevance_fallback_total").increment(1);
                RelevanceVerdict::fallback(format!("Scoring failed: {e}"))
            }
        }
    }
}
