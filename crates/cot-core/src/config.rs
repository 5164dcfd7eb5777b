use std::{env, time::Duration};

use crate::{
    domain::{ChannelId, UserId},
    errors::Error,
    Result,
};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SLACK_API_BASE_URL: &str = "https://slack.com/api";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Typed configuration, read once at startup and shared as `Arc<Config>`.
#[derive(Clone)]
pub struct Config {
    // Slack credentials
    pub secret_channel: ChannelId,
    pub slack_bot_token: String,
    pub slack_signing_secret: String,
    /// Bot identity used to pick its own messages during DM cleanup.
    /// Resolved via `auth.test` at startup when unset.
    pub slack_bot_user_id: Option<UserId>,

    // Network
    pub port: u16,
    pub slack_api_base_url: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Existing env always wins over `.env`.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (env, map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret_channel = required(&lookup, "SLACK_SECRET_CHANNEL")?;
        let slack_bot_token = required(&lookup, "SLACK_BOT_TOKEN")?;
        let slack_signing_secret = required(&lookup, "SLACK_SIGNING_SECRET")?;
        let slack_bot_user_id = lookup("SLACK_BOT_USER_ID")
            .and_then(non_empty)
            .map(UserId);

        let port = match lookup("PORT").and_then(non_empty) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {raw}")))?,
            None => DEFAULT_PORT,
        };

        let slack_api_base_url = lookup("SLACK_API_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE_URL.to_string());

        let http_timeout = Duration::from_millis(
            lookup("SLACK_HTTP_TIMEOUT_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
        );

        Ok(Self {
            secret_channel: ChannelId(secret_channel),
            slack_bot_token,
            slack_signing_secret,
            slack_bot_user_id,
            port,
            slack_api_base_url,
            http_timeout,
        })
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret_channel", &self.secret_channel)
            .field("slack_bot_token", &"<redacted>")
            .field("slack_signing_secret", &"<redacted>")
            .field("slack_bot_user_id", &self.slack_bot_user_id)
            .field("port", &self.port)
            .field("slack_api_base_url", &self.slack_api_base_url)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} is not set.")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
