// src/error.rs
//! Typed errors for the places where callers branch on the failure kind.
//! Everything else flows through `anyhow::Result` with context.

use std::time::Duration;

/// Failure of a single publish attempt against a channel API.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{channel} rate limited (retry after {}s)", retry_after.as_secs())]
    RateLimited {
        channel: String,
        retry_after: Duration,
    },

    #[error("{channel} rejected the request (HTTP {status}): {body}")]
    Rejected {
        channel: String,
        status: u16,
        body: String,
    },

    #[error("{channel} transport error: {source}")]
    Transport {
        channel: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no {channel} content to publish")]
    MissingContent { channel: String },
}

impl PublishError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PublishError::RateLimited { .. })
    }
}

/// Fatal startup misconfiguration. Nothing else is allowed to stop the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("failed to read config file {path}: {message}")]
    File { path: String, message: String },
}
