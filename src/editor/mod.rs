// src/editor/mod.rs
//! Content generation: turns a candidate plus its call-to-action URL into
//! per-channel payloads. Every enabled channel always gets something: a
//! model failure degrades to a minimal template instead of dropping it.

pub mod gemini;
pub mod prompts;
pub mod scoring;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::herald::{
    truncate_chars, Channel, LinkButton, LinkedInPost, Payload, TelegramPost, XThread,
};
use crate::ingest::types::Candidate;

pub const TWEET_MAX: usize = 280;
const SIGNATURE: &str = "🐺 Wolfsfera Intelligence";

/// A text-completion backend. One prompt in, raw text out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Which channels content should be generated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnabledChannels {
    pub telegram: bool,
    pub x: bool,
    pub linkedin: bool,
}

impl EnabledChannels {
    pub fn any(&self) -> bool {
        self.telegram || self.x || self.linkedin
    }
}

/// Per-channel payloads for one candidate. Absent channels were not requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedContent {
    pub stub_url: String,
    pub telegram: Option<TelegramPost>,
    pub x: Option<XThread>,
    pub linkedin: Option<LinkedInPost>,
}

impl GeneratedContent {
    pub fn payload_for(&self, channel: &Channel) -> Option<Payload> {
        match channel {
            Channel::Telegram => self.telegram.clone().map(Payload::Telegram),
            Channel::X => self.x.clone().map(Payload::X),
            Channel::LinkedIn => self.linkedin.clone().map(Payload::LinkedIn),
            Channel::Other(_) => None,
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Never fails; channels whose generation fails get a fallback template.
    async fn generate(&self, candidate: &Candidate, stub_url: &str) -> GeneratedContent;
}

/// Model-backed generator.
pub struct Editor {
    model: Arc<dyn TextModel>,
    channels: EnabledChannels,
    site_url: String,
}

impl Editor {
    pub fn new(model: Arc<dyn TextModel>, channels: EnabledChannels, site_url: impl Into<String>) -> Self {
        Self {
            model,
            channels,
            site_url: site_url.into(),
        }
    }

    async fn telegram(&self, c: &Candidate, stub_url: &str) -> TelegramPost {
        let buttons = telegram_buttons(stub_url, &c.source_url, &self.site_url);
        let message = match self.model.complete(&prompts::telegram(c)).await {
            Ok(text) => {
                let cleaned = strip_fences(&text);
                if cleaned.is_empty() {
                    warn!(target: "editor", id = %c.id, "empty telegram text, using template");
                    fallback_telegram(c)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!(target: "editor", id = %c.id, error = ?e, "telegram generation failed");
                fallback_telegram(c)
            }
        };
        TelegramPost {
            message,
            buttons,
            image_url: c.image_url.clone(),
        }
    }

    async fn x_thread(&self, c: &Candidate, stub_url: &str) -> XThread {
        let generated = match self.model.complete(&prompts::x_thread(c, stub_url)).await {
            Ok(text) => parse_thread(&text),
            Err(e) => Err(e),
        };
        let tweets = generated.unwrap_or_else(|e| {
            warn!(target: "editor", id = %c.id, error = ?e, "x thread generation failed");
            vec![fallback_tweet(c, stub_url)]
        });
        XThread { tweets }
    }

    async fn linkedin(&self, c: &Candidate, stub_url: &str) -> LinkedInPost {
        let text = match self.model.complete(&prompts::linkedin(c, stub_url)).await {
            Ok(text) if !strip_fences(&text).is_empty() => strip_fences(&text),
            Ok(_) => fallback_linkedin(c, stub_url),
            Err(e) => {
                warn!(target: "editor", id = %c.id, error = ?e, "linkedin generation failed");
                fallback_linkedin(c, stub_url)
            }
        };
        LinkedInPost { text }
    }
}

#[async_trait]
impl ContentGenerator for Editor {
    async fn generate(&self, c: &Candidate, stub_url: &str) -> GeneratedContent {
        // With nothing enabled we still render Telegram so the cycle log shows a preview.
        let want_telegram = self.channels.telegram || !self.channels.any();
        if !self.channels.any() {
            info!(target: "editor", "no channel enabled, generating telegram preview");
        }

        let (telegram, x, linkedin) = tokio::join!(
            async {
                if want_telegram {
                    Some(self.telegram(c, stub_url).await)
                } else {
                    None
                }
            },
            async {
                if self.channels.x {
                    Some(self.x_thread(c, stub_url).await)
                } else {
                    None
                }
            },
            async {
                if self.channels.linkedin {
                    Some(self.linkedin(c, stub_url).await)
                } else {
                    None
                }
            },
        );

        info!(
            target: "editor",
            id = %c.id,
            telegram = telegram.is_some(),
            x_tweets = x.as_ref().map_or(0, |t| t.tweets.len()),
            linkedin = linkedin.is_some(),
            "content generated"
        );

        GeneratedContent {
            stub_url: stub_url.to_string(),
            telegram,
            x,
            linkedin,
        }
    }
}

/// Remove markdown code fences a model wraps around its answer.
pub fn strip_fences(text: &str) -> String {
    static RE_FENCE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| regex::Regex::new(r"```[A-Za-z]*\n?").unwrap());
    re.replace_all(text, "").trim().to_string()
}

/// Accepts either a bare JSON array of strings or `{"tweets": [...]}`.
/// Tweets over the limit are cut; non-strings and empty strings are dropped.
pub fn parse_thread(text: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(&strip_fences(text))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tweets") {
            Some(Value::Array(items)) => items,
            _ => return Err(anyhow!("thread object has no tweets array")),
        },
        _ => return Err(anyhow!("thread is not a JSON array")),
    };
    let tweets: Vec<String> = items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(truncate_chars(&s, TWEET_MAX, "...")),
            _ => None,
        })
        .collect();
    if tweets.is_empty() {
        return Err(anyhow!("thread has no usable tweets"));
    }
    Ok(tweets)
}

pub fn telegram_buttons(stub_url: &str, source_url: &str, site_url: &str) -> Vec<Vec<LinkButton>> {
    let button = |text: &str, url: String| LinkButton {
        text: text.to_string(),
        url,
    };
    vec![
        vec![
            button("📰 Read analysis", stub_url.to_string()),
            button("🔗 Original source", source_url.to_string()),
        ],
        vec![
            button("🔮 Oracle", format!("{site_url}/oraculo")),
            button("🐺 Wolfsfera", site_url.to_string()),
        ],
    ]
}

pub fn fallback_telegram(c: &Candidate) -> String {
    let summary: String = c.summary.chars().take(200).collect();
    format!(
        "🚨 <b>BREAKING</b>\n\n<b>{}</b>\n\n{}\n\n{SIGNATURE}",
        html_escape::encode_text(&c.title),
        html_escape::encode_text(&summary),
    )
}

pub fn fallback_tweet(c: &Candidate, stub_url: &str) -> String {
    truncate_chars(
        &format!("🚨 {}\n\nMore 👉 {stub_url}\n\n#Binance #Crypto", c.title),
        TWEET_MAX,
        "...",
    )
}

pub fn fallback_linkedin(c: &Candidate, stub_url: &str) -> String {
    format!(
        "{}\n\n{}\n\nFull analysis: {stub_url}\n\n#Blockchain #Crypto",
        c.title, c.summary
    )
}
