// src/config/mod.rs
//! Process configuration: optional TOML file (`HERALD_CONFIG_PATH`) as the base
//! layer, environment variables on top. Only the Gemini key is mandatory.

pub mod delays;

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use delays::{DelayWindow, DelayWindows};

pub const ENV_CONFIG_PATH: &str = "HERALD_CONFIG_PATH";

const DEFAULT_CMS_URL: &str = "https://www.wolfsfera.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_RSS_FEED: &str = "https://www.binance.com/en/feed/rss";
const DEFAULT_ANNOUNCEMENTS_URL: &str = "https://www.binance.com/bapi/composite/v1/public/cms/article/list/query?type=1&pageNo=1&pageSize=10&catalogId=48";

#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub channel_id: String,
}

#[derive(Debug, Clone)]
pub struct HeraldConfig {
    pub check_interval: Duration,
    pub max_posts_per_day: u32,
    pub delays: DelayWindows,
    pub seen_file: PathBuf,
    pub temp_dir: PathBuf,
    pub port: u16,

    pub gemini_api_key: String,
    pub gemini_model: String,

    pub telegram: Option<TelegramCredentials>,
    pub x_bearer_token: Option<String>,
    pub linkedin_access_token: Option<String>,

    pub cms_url: String,
    pub cms_secret: Option<String>,

    pub rss_feeds: Vec<String>,
    pub announcements_url: Option<String>,
    pub submissions_dir: Option<PathBuf>,
}

/// TOML layer. Every key is optional; env vars override whatever is set here.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub check_interval_secs: Option<u64>,
    pub max_posts_per_day: Option<u32>,
    pub bounded_burst: Option<DelayWindow>,
    pub slow_cadence: Option<DelayWindow>,
    pub fallback: Option<DelayWindow>,
    pub seen_file: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub gemini_model: Option<String>,
    pub cms_url: Option<String>,
    pub rss_feeds: Option<Vec<String>>,
    pub announcements_url: Option<String>,
    pub submissions_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl HeraldConfig {
    /// Reads `.env`-populated process environment, layered over the TOML file
    /// named by `HERALD_CONFIG_PATH` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => FileConfig::load_from(Path::new(&p))?,
            Err(_) => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a file layer with a key lookup (the environment in production).
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingEnvVar("GEMINI_API_KEY"))?;

        let check_interval_secs = parse_or("CHECK_INTERVAL_SECS", get("CHECK_INTERVAL_SECS"))?
            .or(file.check_interval_secs)
            .unwrap_or(120);
        if check_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHECK_INTERVAL_SECS",
                message: "must be greater than zero".into(),
            });
        }

        let max_posts_per_day = parse_or("MAX_POSTS_PER_DAY", get("MAX_POSTS_PER_DAY"))?
            .or(file.max_posts_per_day)
            .unwrap_or(15);

        let defaults = DelayWindows::default();
        let burst_base = file.bounded_burst.unwrap_or(defaults.bounded_burst);
        let burst_min = parse_or("QUEUE_DELAY_MIN_MS", get("QUEUE_DELAY_MIN_MS"))?
            .unwrap_or(burst_base.min_ms);
        let burst_max = parse_or("QUEUE_DELAY_MAX_MS", get("QUEUE_DELAY_MAX_MS"))?
            .unwrap_or(burst_base.max_ms);
        let delays = DelayWindows {
            bounded_burst: DelayWindow::new(burst_min, burst_max),
            slow_cadence: file
                .slow_cadence
                .map(|w| DelayWindow::new(w.min_ms, w.max_ms))
                .unwrap_or(defaults.slow_cadence),
            fallback: file
                .fallback
                .map(|w| DelayWindow::new(w.min_ms, w.max_ms))
                .unwrap_or(defaults.fallback),
        };

        let port = parse_or("PORT", get("PORT"))?.or(file.port).unwrap_or(8080);

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHANNEL_ID")) {
            (Some(bot_token), Some(channel_id)) => Some(TelegramCredentials {
                bot_token,
                channel_id,
            }),
            _ => None,
        };

        let rss_feeds = get("RSS_FEEDS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .or(file.rss_feeds)
            .unwrap_or_else(|| vec![DEFAULT_RSS_FEED.to_string()]);

        Ok(Self {
            check_interval: Duration::from_secs(check_interval_secs),
            max_posts_per_day,
            delays,
            seen_file: get("SEEN_FILE")
                .map(PathBuf::from)
                .or(file.seen_file)
                .unwrap_or_else(|| PathBuf::from("data/seen.json")),
            temp_dir: get("TEMP_DIR")
                .map(PathBuf::from)
                .or(file.temp_dir)
                .unwrap_or_else(|| PathBuf::from("temp")),
            port,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL")
                .or(file.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            telegram,
            x_bearer_token: get("X_BEARER_TOKEN"),
            linkedin_access_token: get("LINKEDIN_ACCESS_TOKEN"),
            cms_url: get("CMS_URL")
                .or(file.cms_url)
                .unwrap_or_else(|| DEFAULT_CMS_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            cms_secret: get("CMS_SECRET"),
            rss_feeds,
            announcements_url: get("ANNOUNCEMENTS_URL")
                .or(file.announcements_url)
                .or_else(|| Some(DEFAULT_ANNOUNCEMENTS_URL.to_string()))
                .filter(|u| u != "off"),
            submissions_dir: get("SUBMISSIONS_DIR")
                .map(PathBuf::from)
                .or(file.submissions_dir),
        })
    }

    pub fn telegram_enabled(&self) -> bool {
        self.telegram.is_some()
    }

    pub fn x_enabled(&self) -> bool {
        self.x_bearer_token.is_some()
    }

    pub fn linkedin_enabled(&self) -> bool {
        self.linkedin_access_token.is_some()
    }

    pub fn cms_enabled(&self) -> bool {
        self.cms_secret.is_some()
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(v) => v.parse::<T>().map(Some).map_err(|_| ConfigError::InvalidValue {
            key,
            message: format!("cannot parse {v:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_gemini_key_is_fatal() {
        let err = HeraldConfig::resolve(FileConfig::default(), lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("GEMINI_API_KEY")));
    }

    #[test]
    fn defaults_apply_and_channels_follow_credentials() {
        let cfg = HeraldConfig::resolve(
            FileConfig::default(),
            lookup(&[
                ("GEMINI_API_KEY", "k"),
                ("TELEGRAM_BOT_TOKEN", "t"),
                ("TELEGRAM_CHANNEL_ID", "@chan"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.check_interval, Duration::from_secs(120));
        assert_eq!(cfg.max_posts_per_day, 15);
        assert_eq!(cfg.delays, DelayWindows::default());
        assert!(cfg.telegram_enabled());
        assert!(!cfg.x_enabled());
        assert!(!cfg.linkedin_enabled());
        assert!(!cfg.cms_enabled());
        assert_eq!(cfg.seen_file, PathBuf::from("data/seen.json"));
    }

    #[test]
    fn env_overrides_file_layer() {
        let file: FileConfig = toml::from_str(
            r#"
            check_interval_secs = 300
            max_posts_per_day = 4
            bounded_burst = { min_ms = 1000, max_ms = 2000 }
            "#,
        )
        .unwrap();
        let cfg = HeraldConfig::resolve(
            file,
            lookup(&[("GEMINI_API_KEY", "k"), ("MAX_POSTS_PER_DAY", "9"), ("QUEUE_DELAY_MAX_MS", "5000")]),
        )
        .unwrap();
        assert_eq!(cfg.check_interval, Duration::from_secs(300));
        assert_eq!(cfg.max_posts_per_day, 9);
        assert_eq!(cfg.delays.bounded_burst, DelayWindow::new(1000, 5000));
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = HeraldConfig::resolve(
            FileConfig::default(),
            lookup(&[("GEMINI_API_KEY", "k"), ("CHECK_INTERVAL_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "CHECK_INTERVAL_SECS",
                ..
            }
        ));
    }
}
