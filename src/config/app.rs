// src/config/app.rs
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::notify::telegram::DEFAULT_API_BASE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Runtime settings, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Public base URL of this service; enables the self-ping when set.
    pub external_url: Option<String>,
    pub poll_interval: Duration,
    pub keepalive_interval: Duration,
    pub data_dir: PathBuf,
    pub sources_path: Option<PathBuf>,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    pub notify_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub telegram_api_base: String,
}

// token stays out of logs
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bot_token", &format_args!("<{} chars>", self.bot_token.len()))
            .field("chat_id", &self.chat_id)
            .field("external_url", &self.external_url)
            .field("poll_interval", &self.poll_interval)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("data_dir", &self.data_dir)
            .field("sources_path", &self.sources_path)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("notify_timeout", &self.notify_timeout)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("telegram_api_base", &self.telegram_api_base)
            .finish()
    }
}

const MIN_POLL_SECS: u64 = 5;

impl AppConfig {
    /// Read from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same rules as `from_env`, over an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let val = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| get(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let bot_token = val(&["TELEGRAM_BOT_TOKEN", "BOT_TOKEN"])
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let chat_id = val(&["TELEGRAM_CHAT_ID", "ADMIN_CHAT_ID"])
            .ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;
        // numeric ids (groups are negative) or @channelname
        if let Some(channel) = chat_id.strip_prefix('@') {
            if channel.is_empty() {
                return Err(invalid("TELEGRAM_CHAT_ID", "empty channel name"));
            }
        } else {
            match chat_id.parse::<i64>() {
                Ok(0) => return Err(invalid("TELEGRAM_CHAT_ID", "must not be 0")),
                Ok(_) => {}
                Err(_) => {
                    return Err(invalid("TELEGRAM_CHAT_ID", "expected an integer or @channel"))
                }
            }
        }

        let external_url = match val(&["EXTERNAL_URL", "RENDER_EXTERNAL_URL"]) {
            Some(u) => {
                let parsed = reqwest::Url::parse(&u)
                    .map_err(|e| invalid("EXTERNAL_URL", &e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(invalid("EXTERNAL_URL", "must be http(s)"));
                }
                Some(u.trim_end_matches('/').to_string())
            }
            None => None,
        };

        let secs = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match val(&[key]) {
                None => Ok(default),
                Some(v) => v
                    .parse::<u64>()
                    .map_err(|_| invalid(key, &format!("'{v}' is not a whole number"))),
            }
        };

        let poll_secs = secs("POLL_INTERVAL_SECS", 60)?.max(MIN_POLL_SECS);
        let keepalive_secs = secs("KEEPALIVE_INTERVAL_SECS", 600)?.max(30);
        let fetch_secs = secs("FETCH_TIMEOUT_SECS", 10)?.max(1);
        let connect_secs = secs("CONNECT_TIMEOUT_SECS", 5)?.max(1);
        let notify_secs = secs("NOTIFY_TIMEOUT_SECS", 10)?.max(1);
        let max_concurrent = secs("MAX_CONCURRENT_FETCHES", 4)?.clamp(1, 32) as usize;

        Ok(Self {
            bot_token,
            chat_id,
            external_url,
            poll_interval: Duration::from_secs(poll_secs),
            keepalive_interval: Duration::from_secs(keepalive_secs),
            data_dir: PathBuf::from(val(&["DATA_DIR"]).unwrap_or_else(|| "data".into())),
            sources_path: val(&["SOURCES_PATH"]).map(PathBuf::from),
            fetch_timeout: Duration::from_secs(fetch_secs),
            connect_timeout: Duration::from_secs(connect_secs),
            notify_timeout: Duration::from_secs(notify_secs),
            max_concurrent_fetches: max_concurrent,
            telegram_api_base: val(&["TELEGRAM_API_BASE"])
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
