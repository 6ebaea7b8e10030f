// src/herald/telegram.rs
//! Telegram Bot API publisher (broadcast channel).

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{strip_tags, truncate_chars, Channel, LinkButton, Payload, Publisher, TelegramPost};
use crate::error::PublishError;

const CHANNEL: &str = "telegram";
/// Photo captions are limited to 1024 characters.
const CAPTION_MAX: usize = 1024;
const PLAIN_CAPTION_MAX: usize = 1000;
const PLAIN_MESSAGE_MAX: usize = 4000;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

pub struct TelegramPublisher {
    bot_token: String,
    channel_id: String,
    client: Client,
}

impl TelegramPublisher {
    pub fn new(bot_token: String, channel_id: String) -> Self {
        Self {
            bot_token,
            channel_id,
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    async fn call(&self, method: &str, body: &Value) -> Result<ApiResponse, PublishError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                channel: CHANNEL.into(),
                source,
            })?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parsed
                .as_ref()
                .and_then(|r| r.parameters.as_ref())
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(PublishError::RateLimited {
                channel: CHANNEL.into(),
                retry_after,
            });
        }

        match parsed {
            Some(r) if status.is_success() && r.ok => Ok(r),
            Some(r) => Err(PublishError::Rejected {
                channel: CHANNEL.into(),
                status: status.as_u16(),
                body: r.description.unwrap_or(text),
            }),
            None => Err(PublishError::Rejected {
                channel: CHANNEL.into(),
                status: status.as_u16(),
                body: text,
            }),
        }
    }

    async fn send_rich(&self, post: &TelegramPost) -> Result<(), PublishError> {
        let (method, body) = rich_request(&self.channel_id, post);
        self.call(method, &body).await.map(|_| ())
    }

    async fn send_plain(&self, post: &TelegramPost) -> Result<(), PublishError> {
        let (method, body) = plain_request(&self.channel_id, post);
        self.call(method, &body).await.map(|_| ())
    }
}

fn keyboard(rows: &[Vec<LinkButton>]) -> Value {
    json!({ "inline_keyboard": rows })
}

/// HTML request: photo with caption when an image fits the caption limit,
/// otherwise a text message.
fn rich_request(chat_id: &str, post: &TelegramPost) -> (&'static str, Value) {
    match &post.image_url {
        Some(url) if post.message.chars().count() <= CAPTION_MAX => (
            "sendPhoto",
            json!({
                "chat_id": chat_id,
                "photo": url,
                "caption": post.message,
                "parse_mode": "HTML",
                "reply_markup": keyboard(&post.buttons),
            }),
        ),
        _ => (
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": post.message,
                "parse_mode": "HTML",
                "reply_markup": keyboard(&post.buttons),
                "disable_web_page_preview": false,
            }),
        ),
    }
}

/// Fallback without `parse_mode`, used when Telegram rejects our HTML.
fn plain_request(chat_id: &str, post: &TelegramPost) -> (&'static str, Value) {
    let plain = strip_tags(&post.message);
    match &post.image_url {
        Some(url) => (
            "sendPhoto",
            json!({
                "chat_id": chat_id,
                "photo": url,
                "caption": truncate_chars(&plain, PLAIN_CAPTION_MAX, "..."),
                "reply_markup": keyboard(&post.buttons),
            }),
        ),
        None => (
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": truncate_chars(&plain, PLAIN_MESSAGE_MAX, "..."),
                "reply_markup": keyboard(&post.buttons),
            }),
        ),
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn publish(&self, payload: &Payload) -> Result<(), PublishError> {
        let Payload::Telegram(post) = payload else {
            return Err(PublishError::MissingContent {
                channel: CHANNEL.into(),
            });
        };

        match self.send_rich(post).await {
            Ok(()) => {
                tracing::info!(target: "herald", channel = CHANNEL, chat = %self.channel_id, "sent");
                Ok(())
            }
            Err(PublishError::Rejected { status: 400, body, .. }) => {
                tracing::warn!(target: "herald", channel = CHANNEL, %body, "bad request, retrying as plain text");
                self.send_plain(post).await?;
                tracing::info!(target: "herald", channel = CHANNEL, "sent plain-text fallback");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn probe(&self) -> anyhow::Result<String> {
        let me = self
            .call("getMe", &json!({}))
            .await
            .context("telegram getMe")?;
        let username = me
            .result
            .as_ref()
            .and_then(|r| r.get("username"))
            .and_then(|u| u.as_str())
            .ok_or_else(|| anyhow!("getMe returned no username"))?
            .to_string();
        Ok(format!("@{username} -> {}", self.channel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(message: &str, image: Option<&str>) -> TelegramPost {
        TelegramPost {
            message: message.to_string(),
            buttons: vec![vec![LinkButton {
                text: "Read".into(),
                url: "https://site.test/a".into(),
            }]],
            image_url: image.map(str::to_string),
        }
    }

    #[test]
    fn short_message_with_image_goes_as_photo() {
        let (method, body) = rich_request("@chan", &post("<b>Hi</b>", Some("https://img.test/a.png")));
        assert_eq!(method, "sendPhoto");
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["reply_markup"]["inline_keyboard"][0][0]["url"], "https://site.test/a");
    }

    #[test]
    fn long_message_with_image_goes_as_text() {
        let long = "x".repeat(CAPTION_MAX + 1);
        let (method, _) = rich_request("@chan", &post(&long, Some("https://img.test/a.png")));
        assert_eq!(method, "sendMessage");
    }

    #[test]
    fn plain_fallback_strips_html_and_parse_mode() {
        let (method, body) = plain_request("@chan", &post("<b>Breaking</b> news", None));
        assert_eq!(method, "sendMessage");
        assert_eq!(body["text"], "Breaking news");
        assert!(body.get("parse_mode").is_none());
    }
}
