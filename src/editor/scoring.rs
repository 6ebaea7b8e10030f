// src/editor/scoring.rs
//! Model-backed scoring collaborator for the relevance gate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{prompts, strip_fences, TextModel};
use crate::ingest::types::{Candidate, Category};
use crate::relevance::{ScoreReport, Scorer};

#[derive(Debug, Deserialize)]
struct RawScore {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

pub struct ModelScorer {
    model: Arc<dyn TextModel>,
}

impl ModelScorer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }
}

/// Parse the model's JSON verdict. A missing score becomes 0, which the gate
/// treats as unscored.
pub fn parse_score(text: &str) -> Result<ScoreReport> {
    let raw: RawScore =
        serde_json::from_str(&strip_fences(text)).context("score response is not JSON")?;
    Ok(ScoreReport {
        raw_score: raw.score.unwrap_or(0.0),
        reason: raw
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "No reason provided".to_string()),
        category: raw
            .category
            .as_deref()
            .map(Category::from_tag)
            .unwrap_or(Category::Minor),
    })
}

#[async_trait]
impl Scorer for ModelScorer {
    async fn score(&self, candidate: &Candidate) -> Result<ScoreReport> {
        let text = self
            .model
            .complete(&prompts::relevance(candidate))
            .await
            .context("scoring call")?;
        parse_score(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let r = parse_score("```json\n{\"score\": 9, \"reason\": \"major listing\", \"category\": \"listing\"}\n```").unwrap();
        assert_eq!(r.raw_score, 9.0);
        assert_eq!(r.reason, "major listing");
        assert_eq!(r.category, Category::Listing);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let r = parse_score("{}").unwrap();
        assert_eq!(r.raw_score, 0.0);
        assert_eq!(r.reason, "No reason provided");
        assert_eq!(r.category, Category::Minor);
    }

    #[test]
    fn prose_is_an_error() {
        assert!(parse_score("I think this is a 7").is_err());
    }
}
