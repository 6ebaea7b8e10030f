// src/herald/linkedin.rs
//! LinkedIn UGC posts publisher (slow-cadence channel). Text only.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Channel, Payload, Publisher};
use crate::error::PublishError;

const CHANNEL: &str = "linkedin";
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    name: Option<String>,
}

pub struct LinkedInPublisher {
    access_token: String,
    client: Client,
}

impl LinkedInPublisher {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn user_info(&self) -> Result<UserInfo, PublishError> {
        let resp = self
            .client
            .get("https://api.linkedin.com/v2/userinfo")
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?.json().await.map_err(transport)
    }
}

fn transport(source: reqwest::Error) -> PublishError {
    PublishError::Transport {
        channel: CHANNEL.into(),
        source,
    }
}

async fn check_status(resp: Response) -> Result<Response, PublishError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(PublishError::RateLimited {
            channel: CHANNEL.into(),
            retry_after: DEFAULT_RETRY_AFTER,
        });
    }
    if !status.is_success() {
        return Err(PublishError::Rejected {
            channel: CHANNEL.into(),
            status: status.as_u16(),
            body: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

fn ugc_post_body(person_urn: &str, text: &str) -> Value {
    json!({
        "author": person_urn,
        "lifecycleState": "PUBLISHED",
        "specificContent": {
            "com.linkedin.ugc.ShareContent": {
                "shareCommentary": { "text": text },
                "shareMediaCategory": "NONE"
            }
        },
        "visibility": {
            "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
        }
    })
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn channel(&self) -> Channel {
        Channel::LinkedIn
    }

    async fn publish(&self, payload: &Payload) -> Result<(), PublishError> {
        let post = match payload {
            Payload::LinkedIn(p) if !p.text.trim().is_empty() => p,
            _ => {
                return Err(PublishError::MissingContent {
                    channel: CHANNEL.into(),
                })
            }
        };

        let me = self.user_info().await?;
        let urn = format!("urn:li:person:{}", me.sub);
        let resp = self
            .client
            .post("https://api.linkedin.com/v2/ugcPosts")
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&ugc_post_body(&urn, &post.text))
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?;
        tracing::info!(target: "herald", channel = CHANNEL, "post published");
        Ok(())
    }

    async fn probe(&self) -> anyhow::Result<String> {
        let me = self.user_info().await.context("linkedin userinfo")?;
        Ok(me.name.unwrap_or(me.sub))
    }
}
