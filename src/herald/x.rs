// src/herald/x.rs
//! X (Twitter) v2 publisher. Posts a thread as a reply chain, authenticated
//! with an OAuth 2.0 user-context bearer token.

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{Channel, Payload, Publisher};
use crate::error::PublishError;

const CHANNEL: &str = "x";
const API_BASE: &str = "https://api.twitter.com/2";
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    data: MeData,
}

#[derive(Debug, Deserialize)]
struct MeData {
    username: String,
}

pub struct XPublisher {
    bearer_token: String,
    client: Client,
}

impl XPublisher {
    pub fn new(bearer_token: String) -> Self {
        Self {
            bearer_token,
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn post_tweet(&self, text: &str, reply_to: Option<&str>) -> Result<String, PublishError> {
        let mut body = json!({ "text": text });
        if let Some(id) = reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": id });
        }

        let resp = self
            .client
            .post(format!("{API_BASE}/tweets"))
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                channel: CHANNEL.into(),
                source,
            })?;
        let resp = check_status(resp).await?;
        let parsed: TweetResponse = resp.json().await.map_err(|source| PublishError::Transport {
            channel: CHANNEL.into(),
            source,
        })?;
        Ok(parsed.data.id)
    }
}

async fn check_status(resp: Response) -> Result<Response, PublishError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return Err(PublishError::RateLimited {
            channel: CHANNEL.into(),
            retry_after,
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::FORBIDDEN {
            tracing::error!(target: "herald", channel = CHANNEL, "forbidden, check API permissions and credits");
        }
        return Err(PublishError::Rejected {
            channel: CHANNEL.into(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl Publisher for XPublisher {
    fn channel(&self) -> Channel {
        Channel::X
    }

    async fn publish(&self, payload: &Payload) -> Result<(), PublishError> {
        let thread = match payload {
            Payload::X(t) if !t.tweets.is_empty() => t,
            _ => {
                return Err(PublishError::MissingContent {
                    channel: CHANNEL.into(),
                })
            }
        };

        let mut last_id: Option<String> = None;
        for (i, tweet) in thread.tweets.iter().enumerate() {
            let id = self.post_tweet(tweet, last_id.as_deref()).await?;
            tracing::debug!(target: "herald", channel = CHANNEL, n = i + 1, total = thread.tweets.len(), "tweet posted");
            last_id = Some(id);

            if i + 1 < thread.tweets.len() {
                let pause = rand::rng().random_range(1_000..=3_000);
                tokio::time::sleep(Duration::from_millis(pause)).await;
            }
        }
        tracing::info!(target: "herald", channel = CHANNEL, tweets = thread.tweets.len(), "thread posted");
        Ok(())
    }

    async fn probe(&self) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(format!("{API_BASE}/users/me"))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .context("x users/me")?;
        let me: MeResponse = check_status(resp)
            .await
            .context("x users/me status")?
            .json()
            .await
            .context("x users/me body")?;
        Ok(format!("@{}", me.data.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::herald::{TelegramPost, XThread};

    #[tokio::test]
    async fn empty_or_foreign_payload_is_missing_content() {
        let x = XPublisher::new("token".into());

        let empty = Payload::X(XThread { tweets: vec![] });
        let err = x.publish(&empty).await.unwrap_err();
        assert!(matches!(err, PublishError::MissingContent { .. }));

        let foreign = Payload::Telegram(TelegramPost {
            message: "hi".into(),
            buttons: vec![],
            image_url: None,
        });
        let err = x.publish(&foreign).await.unwrap_err();
        assert!(matches!(err, PublishError::MissingContent { .. }));
    }
}
