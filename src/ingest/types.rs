// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a candidate. `UserSubmitted` is the privileged path that
/// skips scoring and unlocks every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Feed,
    Listing,
    Partnership,
    Regulatory,
    Technical,
    Minor,
    UserSubmitted,
}

impl Category {
    /// Lenient mapping from free-form tags; unknown tags are plain feed items.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "listing" => Category::Listing,
            "partnership" => Category::Partnership,
            "regulatory" => Category::Regulatory,
            "technical" => Category::Technical,
            "minor" => Category::Minor,
            "user-content" | "user-submitted" => Category::UserSubmitted,
            _ => Category::Feed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Feed => "feed",
            Category::Listing => "listing",
            Category::Partnership => "partnership",
            Category::Regulatory => "regulatory",
            Category::Technical => "technical",
            Category::Minor => "minor",
            Category::UserSubmitted => "user-submitted",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of content discovered by a source during one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub category: Category,
    pub image_url: Option<String>,
    pub full_body: Option<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_url: source_url.into(),
            summary: String::new(),
            published_at: Utc::now(),
            category: Category::Feed,
            image_url: None,
            full_body: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Body if scraped, otherwise the summary.
    pub fn body_or_summary(&self) -> &str {
        self.full_body.as_deref().unwrap_or(&self.summary)
    }
}

/// A fetch collaborator. Any error means "zero candidates from this source".
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_tags_map_leniently() {
        assert_eq!(Category::from_tag("Listing"), Category::Listing);
        assert_eq!(Category::from_tag("user-content"), Category::UserSubmitted);
        assert_eq!(Category::from_tag("something-else"), Category::Feed);
    }
}
