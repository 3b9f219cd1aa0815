//! Client configuration (environment driven).

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

pub const API_URL_VAR: &str = "EVENTHUB_API_URL";
pub const STATE_DIR_VAR: &str = "EVENTHUB_STATE_DIR";
pub const HTTP_TIMEOUT_VAR: &str = "EVENTHUB_HTTP_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the event API (the login endpoint is `<api_url>/auth/login`).
    pub api_url: String,
    /// Directory holding the durable session record.
    pub state_dir: PathBuf,
    pub http_timeout: Duration,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidApiUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("no application data directory found; set EVENTHUB_STATE_DIR")]
    NoStateDir,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_url = match value(API_URL_VAR) {
            Some(url) => parse_api_url(API_URL_VAR, url)?,
            None => {
                tracing::debug!("{API_URL_VAR} not set; using {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_string()
            }
        };

        let state_dir = match value(STATE_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => default_state_dir().ok_or(ConfigError::NoStateDir)?,
        };

        let http_timeout = match value(HTTP_TIMEOUT_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: HTTP_TIMEOUT_VAR,
                        value: raw,
                    });
                }
            },
            None => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            api_url,
            state_dir,
            http_timeout,
        })
    }

    /// Replace the API URL (e.g. from a command-line flag).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url("--api-url", url.into())?;
        Ok(self)
    }
}

fn parse_api_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    let valid = Url::parse(value.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| url.host_str().is_some_and(|host| !host.is_empty()));

    match valid {
        Some(url) => Ok(url.as_str().trim_end_matches('/').to_string()),
        None => Err(ConfigError::InvalidApiUrl { var, value }),
    }
}

/// `<data dir>/eventhub`, falling back to `~/.local/share/eventhub`.
fn default_state_dir() -> Option<PathBuf> {
    let mut dir = dirs::data_dir().or_else(|| {
        dirs::home_dir().map(|mut h| {
            h.push(".local");
            h.push("share");
            h
        })
    })?;
    dir.push("eventhub");
    Some(dir)
}
