// src/ingest/providers/submissions.rs
//! Inbox of user-submitted posts: one `*.txt` file per post, first line is
//! the title, the rest is the body. Files are renamed to `*.txt.done` once
//! read so the same submission is never picked up twice.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::ingest::types::{Candidate, Category, SourceProvider};

const TITLE_PREFIX: &str = "[USER POST] ";

pub struct SubmissionsProvider {
    dir: PathBuf,
    landing_url: String,
}

impl SubmissionsProvider {
    pub fn new(dir: impl Into<PathBuf>, landing_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            landing_url: landing_url.into(),
        }
    }

    async fn read_one(&self, path: &Path) -> Result<Option<Candidate>> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading submission {}", path.display()))?;
        let mut lines = raw.lines();
        let title = lines.next().unwrap_or_default().trim();
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        if title.is_empty() && body.is_empty() {
            return Ok(None);
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let title = if title.is_empty() { "Untitled" } else { title };
        let summary: String = body.chars().take(300).collect();

        Ok(Some(Candidate {
            id: format!("submission-{stem}"),
            title: format!("{TITLE_PREFIX}{title}"),
            source_url: self.landing_url.clone(),
            summary,
            published_at: Utc::now(),
            category: Category::UserSubmitted,
            image_url: None,
            full_body: Some(body),
        }))
    }
}

#[async_trait]
impl SourceProvider for SubmissionsProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("listing submissions dir"),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut out = Vec::new();
        for path in paths {
            match self.read_one(&path).await {
                Ok(Some(c)) => {
                    tracing::info!(target: "ingest", id = %c.id, "user submission found");
                    out.push(c);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, "skipping unreadable submission");
                    continue;
                }
            }
            let done = path.with_extension("txt.done");
            if let Err(e) = fs::rename(&path, &done).await {
                tracing::warn!(target: "ingest", error = %e, path = %path.display(), "could not mark submission consumed");
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "submissions"
    }
}
