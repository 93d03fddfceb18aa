use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::PackError;

pub const DEFAULT_CONFIG_FILE: &str = "braintrust-pack.json";
pub const DEFAULT_API_URL: &str = "https://api.braintrustdata.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const API_KEY_ENV: &str = "BRAINTRUST_API_KEY";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: Url,
    pub timeout: Duration,
}

/// Bearer token injected by the host. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Result<Self, PackError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PackError::MissingCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn from_env() -> Result<Self, PackError> {
        let value = std::env::var(API_KEY_ENV).map_err(|_| PackError::MissingCredential)?;
        Self::new(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PackError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PackError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| PackError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, PackError> {
        let raw_url = config
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_API_URL);
        let api_url = Url::parse(raw_url)
            .map_err(|err| PackError::InvalidConfig(format!("api_url {raw_url}: {err}")))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(PackError::InvalidConfig(format!(
                "api_url must be http(s): {raw_url}"
            )));
        }

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(PackError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(resolved.timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_non_http_url() {
        let config = Config {
            api_url: Some("ftp://example.com/v1".to_string()),
            timeout_secs: None,
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, PackError::InvalidConfig(_));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = Config {
            api_url: None,
            timeout_secs: Some(0),
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, PackError::InvalidConfig(_));
    }

    #[test]
    fn blank_api_key_is_missing() {
        assert_matches!(ApiKey::new("   "), Err(PackError::MissingCredential));
        let key = ApiKey::new(" sk-123 ").unwrap();
        assert_eq!(key.expose(), "sk-123");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }
}
