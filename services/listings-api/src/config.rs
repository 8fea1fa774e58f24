//! Service configuration, read from the environment.
//!
//! Every setting has a default so the service starts with no environment at
//! all. The Telegram credentials fall back to placeholder values, which leave
//! the notification sink disabled rather than failing startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const PLACEHOLDER_BOT_TOKEN: &str = "YOUR_TELEGRAM_BOT_TOKEN";
pub const PLACEHOLDER_CHAT_ID: &str = "YOUR_TELEGRAM_CHAT_ID";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Seed one example listing (id 0) at startup.
    pub seed_example: bool,
    pub telegram: TelegramConfig,
    /// Upper bound on a single notification attempt.
    pub notify_timeout: Duration,
    pub ws: WsConfig,
}

#[derive(Clone)]
pub struct TelegramConfig {
    /// `None` when unset or still the placeholder.
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_url: String,
}

impl TelegramConfig {
    /// Token and chat id, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.bot_token.as_deref()?, self.chat_id.as_deref()?))
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Per-subscriber delivery settings.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Messages queued per subscriber before it is treated as stalled.
    pub outbound_buffer: usize,
    /// Bound on one frame write to the socket.
    pub write_timeout: Duration,
    /// Keepalive ping period.
    pub ping_interval: Duration,
    /// A subscriber that sends nothing, not even a pong, for this long is
    /// treated as half-open and dropped.
    pub idle_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: 64,
            write_timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            seed_example: true,
            telegram: TelegramConfig {
                bot_token: None,
                chat_id: None,
                api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            },
            notify_timeout: Duration::from_secs(5),
            ws: WsConfig::default(),
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "LISTINGS_BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let seed_example = parse_bool(&lookup, "LISTINGS_SEED_EXAMPLE", true)?;

        let telegram = TelegramConfig {
            bot_token: credential(&lookup, "TELEGRAM_BOT_TOKEN", PLACEHOLDER_BOT_TOKEN),
            chat_id: credential(&lookup, "TELEGRAM_CHAT_ID", PLACEHOLDER_CHAT_ID),
            api_url: lookup("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
        };

        let notify_timeout = Duration::from_millis(parse_positive(&lookup, "NOTIFY_TIMEOUT_MS", 5_000)?);

        let ping_interval = Duration::from_secs(parse_positive(&lookup, "WS_PING_INTERVAL_SECS", 30)?);
        let idle_timeout = Duration::from_secs(parse_positive(&lookup, "WS_IDLE_TIMEOUT_SECS", 90)?);
        if idle_timeout < ping_interval {
            return Err(ConfigError::Invalid {
                key: "WS_IDLE_TIMEOUT_SECS",
                value: idle_timeout.as_secs().to_string(),
                reason: "must not be shorter than WS_PING_INTERVAL_SECS".to_string(),
            });
        }
        let ws = WsConfig {
            outbound_buffer: parse_positive(&lookup, "WS_OUTBOUND_BUFFER", 64)?,
            write_timeout: Duration::from_millis(parse_positive(&lookup, "WS_WRITE_TIMEOUT_MS", 5_000)?),
            ping_interval,
            idle_timeout,
        };

        Ok(Self {
            bind_addr,
            seed_example,
            telegram,
            notify_timeout,
            ws,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            key,
            value: String::new(),
            reason: "missing".to_string(),
        }),
    }
}

/// Like `parse_or`, for settings where zero would disable the service.
fn parse_positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_or(lookup, key, Some(default))?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Unset, blank and placeholder values all mean "not configured".
fn credential<F>(lookup: &F, key: &str, placeholder: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != placeholder)
}
