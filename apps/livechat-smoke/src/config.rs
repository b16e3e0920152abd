//! Environment-backed configuration for `livechat-smoke`.

use std::{env, error::Error, fmt};

use livechat_core::{CoordinatorConfig, ReconnectBackoff};
use livechat_runtime::LiveRuntimeConfig;

const DEFAULT_MAX_RETRY: u32 = 3;
const DEFAULT_EVENT_BUFFER: usize = 128;
const DEFAULT_NOTICE_BUFFER: usize = 512;
const DEFAULT_LIST_MAX_ITEMS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Automatic reconnect attempts before giving up.
    pub max_retry: u32,
    /// Whether in-app banners are shown for messages outside the open thread.
    pub in_app_banners: bool,
    pub event_buffer: usize,
    pub notice_buffer: usize,
    /// Cap on conversation list rows.
    pub list_max_items: usize,
}

impl SmokeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let max_retry = parse_optional_u32("LIVECHAT_MAX_RETRY", DEFAULT_MAX_RETRY, &mut lookup)?;
        let in_app_banners = parse_optional_bool("LIVECHAT_IN_APP_BANNERS", true, &mut lookup)?;
        let event_buffer =
            parse_positive_usize("LIVECHAT_EVENT_BUFFER", DEFAULT_EVENT_BUFFER, &mut lookup)?;
        let notice_buffer =
            parse_positive_usize("LIVECHAT_NOTICE_BUFFER", DEFAULT_NOTICE_BUFFER, &mut lookup)?;
        let list_max_items =
            parse_positive_usize("LIVECHAT_LIST_MAX_ITEMS", DEFAULT_LIST_MAX_ITEMS, &mut lookup)?;

        Ok(Self {
            max_retry,
            in_app_banners,
            event_buffer,
            notice_buffer,
            list_max_items,
        })
    }

    pub fn runtime_config(&self) -> LiveRuntimeConfig {
        LiveRuntimeConfig {
            coordinator: CoordinatorConfig {
                in_app_banners: self.in_app_banners,
            },
            backoff: ReconnectBackoff::default().with_max_retry(self.max_retry),
            event_buffer: self.event_buffer,
            notice_buffer: self.notice_buffer,
        }
    }
}

/// Errors produced while parsing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_u32<F>(
    key: &'static str,
    default: u32,
    lookup: &mut F,
) -> Result<u32, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value.parse::<u32>().map_err(|err| ConfigError::InvalidValue {
        key,
        value,
        reason: err.to_string(),
    })
}

fn parse_positive_usize<F>(
    key: &'static str,
    default: usize,
    lookup: &mut F,
) -> Result<usize, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    match value.parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be at least 1".to_owned(),
        }),
        Ok(parsed) => Ok(parsed),
        Err(err) => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        }),
    }
}

fn parse_optional_bool<F>(
    key: &'static str,
    default: bool,
    lookup: &mut F,
) -> Result<bool, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean".to_owned(),
        }),
    }
}
