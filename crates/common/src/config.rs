use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PROVISIONING_URL: &str = "https://mt-provisioning-api-v1.agiliumtrade.agiliumtrade.ai";
pub const DEFAULT_TRADE_VOLUME: f64 = 0.01;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("required variable {0} is not set")]
    Missing(&'static str),
    #[error("variable {key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct MetaApiConfig {
    pub api_key: String,
    pub account_id: String,
    pub provisioning_url: String,
    /// Overrides the regional client API host derived from the account.
    pub client_url: Option<String>,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub sync_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub metaapi: MetaApiConfig,
    pub trade_volume: f64,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let metaapi = MetaApiConfig {
            api_key: required("METAAPI_API_KEY")?,
            account_id: required("METAAPI_ACCOUNT_ID")?,
            provisioning_url: get("METAAPI_PROVISIONING_URL")
                .unwrap_or_else(|| DEFAULT_PROVISIONING_URL.to_string()),
            client_url: get("METAAPI_CLIENT_URL"),
            poll_interval: Duration::from_millis(parse_or(
                "METAAPI_POLL_INTERVAL_MS",
                get("METAAPI_POLL_INTERVAL_MS"),
                1000,
            )?),
            connect_timeout: Duration::from_secs(parse_or(
                "METAAPI_CONNECT_TIMEOUT_SECS",
                get("METAAPI_CONNECT_TIMEOUT_SECS"),
                300,
            )?),
            sync_timeout: Duration::from_secs(parse_or(
                "METAAPI_SYNC_TIMEOUT_SECS",
                get("METAAPI_SYNC_TIMEOUT_SECS"),
                300,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                "METAAPI_REQUEST_TIMEOUT_SECS",
                get("METAAPI_REQUEST_TIMEOUT_SECS"),
                60,
            )?),
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;

        let trade_volume = parse_or("TRADE_VOLUME", get("TRADE_VOLUME"), DEFAULT_TRADE_VOLUME)?;
        if !(trade_volume.is_finite() && trade_volume > 0.0) {
            return Err(ConfigError::Invalid {
                key: "TRADE_VOLUME",
                value: trade_volume.to_string(),
            });
        }

        let log_format = match get("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            telegram_token,
            metaapi,
            trade_volume,
            log_format,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
