// src/herald/mod.rs
//! Output channels: identity, payloads, and the publish collaborators.

pub mod linkedin;
pub mod retry;
pub mod telegram;
pub mod x;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::PublishError;
use retry::RetryPolicy;

/// An output destination. Each channel has its own delay class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Broadcast channel: instant, and never gated by relevance.
    Telegram,
    /// Bounded-burst channel, gated by the X threshold.
    X,
    /// Slow-cadence channel, gated by the LinkedIn threshold.
    LinkedIn,
    /// Ad-hoc tag with the default jitter window.
    Other(String),
}

/// How long to wait before executing a queued action for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayClass {
    Instant,
    BoundedBurst,
    SlowCadence,
    Fallback,
}

impl Channel {
    pub fn delay_class(&self) -> DelayClass {
        match self {
            Channel::Telegram => DelayClass::Instant,
            Channel::X => DelayClass::BoundedBurst,
            Channel::LinkedIn => DelayClass::SlowCadence,
            Channel::Other(_) => DelayClass::Fallback,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Channel::Telegram => "telegram",
            Channel::X => "x",
            Channel::LinkedIn => "linkedin",
            Channel::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramPost {
    /// Telegram-flavoured HTML.
    pub message: String,
    /// Inline keyboard rows.
    pub buttons: Vec<Vec<LinkButton>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XThread {
    pub tweets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedInPost {
    pub text: String,
}

/// Content for exactly one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Telegram(TelegramPost),
    X(XThread),
    LinkedIn(LinkedInPost),
}

/// A publish collaborator. Implementations report rate limiting as
/// [`PublishError::RateLimited`] so the shared retry policy can react.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn channel(&self) -> Channel;

    async fn publish(&self, payload: &Payload) -> Result<(), PublishError>;

    /// Connection check run at startup. Returns a human-readable identity.
    async fn probe(&self) -> anyhow::Result<String>;
}

/// Publish with the channel's bounded retry policy (one retry after a
/// rate-limit signal, nothing else is retried).
pub async fn publish_with_retry(
    publisher: &dyn Publisher,
    payload: &Payload,
    policy: &RetryPolicy,
) -> Result<(), PublishError> {
    let channel = publisher.channel();
    policy
        .run(channel.as_str(), || publisher.publish(payload))
        .await
}

/// Drop HTML tags; used for plain-text fallbacks.
pub(crate) fn strip_tags(s: &str) -> String {
    static RE: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"<[^>]*>?").unwrap());
    re.replace_all(s, "").to_string()
}

/// Truncate to at most `max` characters, appending `suffix` when cut.
pub(crate) fn truncate_chars(s: &str, max: usize, suffix: &str) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(suffix.chars().count());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(suffix);
    out
}
