use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DATA_URL: &str = "VIBE_DATA_URL";
pub const REFRESH_MINUTES: &str = "VIBE_REFRESH_MINUTES";
pub const DEFAULT_RESOLUTION: &str = "VIBE_DEFAULT_RESOLUTION";
pub const REQUEST_TIMEOUT_SECS: &str = "VIBE_REQUEST_TIMEOUT_SECS";
pub const TICKER_SECONDS: &str = "VIBE_TICKER_SECONDS";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Runtime settings, read from the environment (and a `.env` file if present).
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// HTTP base URL or local directory holding the published files.
    pub data_url: String,
    /// How often scores are refetched. `None` turns periodic refresh off.
    pub refresh_every: Option<Duration>,
    /// H3 resolution assumed when no metadata is published.
    pub default_resolution: u8,
    pub request_timeout: Duration,
    pub ticker_every: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_url: "data".to_string(),
            refresh_every: Some(Duration::from_secs(8 * 60 * 60)),
            default_resolution: 4,
            request_timeout: Duration::from_secs(30),
            ticker_every: Duration::from_secs(8),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get(DATA_URL) {
            config.data_url = url;
        }
        if let Some(raw) = get(REFRESH_MINUTES) {
            let minutes: u64 = parse(REFRESH_MINUTES, &raw, "a whole number of minutes")?;
            config.refresh_every = (minutes > 0).then(|| Duration::from_secs(minutes * 60));
        }
        if let Some(raw) = get(DEFAULT_RESOLUTION) {
            let resolution: u8 = parse(DEFAULT_RESOLUTION, &raw, "an H3 resolution between 0 and 15")?;
            if resolution > 15 {
                return Err(ConfigError::Invalid {
                    key: DEFAULT_RESOLUTION,
                    value: raw,
                    expected: "an H3 resolution between 0 and 15",
                });
            }
            config.default_resolution = resolution;
        }
        if let Some(raw) = get(REQUEST_TIMEOUT_SECS) {
            let secs: u64 = parse(REQUEST_TIMEOUT_SECS, &raw, "a positive number of seconds")?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: REQUEST_TIMEOUT_SECS,
                    value: raw,
                    expected: "a positive number of seconds",
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get(TICKER_SECONDS) {
            let secs: u64 = parse(TICKER_SECONDS, &raw, "a whole number of seconds")?;
            config.ticker_every = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str, expected: &'static str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        DashboardConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(config(&[]).unwrap(), DashboardConfig::default());
        assert_eq!(config(&[(DATA_URL, "   ")]).unwrap().data_url, "data");
    }

    #[test]
    fn values_are_read() {
        let cfg = config(&[
            (DATA_URL, "https://cdn.example.org/vibes"),
            (REFRESH_MINUTES, "15"),
            (DEFAULT_RESOLUTION, "3"),
            (REQUEST_TIMEOUT_SECS, "5"),
            (TICKER_SECONDS, "0"),
        ])
        .unwrap();
        assert_eq!(cfg.data_url, "https://cdn.example.org/vibes");
        assert_eq!(cfg.refresh_every, Some(Duration::from_secs(900)));
        assert_eq!(cfg.default_resolution, 3);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.ticker_every, Duration::ZERO);
    }

    #[test]
    fn zero_refresh_disables_it() {
        assert_eq!(config(&[(REFRESH_MINUTES, "0")]).unwrap().refresh_every, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[(REFRESH_MINUTES, "soon")]),
            Err(ConfigError::Invalid { key: REFRESH_MINUTES, .. })
        ));
        assert!(config(&[(DEFAULT_RESOLUTION, "16")]).is_err());
        assert!(config(&[(REQUEST_TIMEOUT_SECS, "0")]).is_err());
        assert!(config(&[(TICKER_SECONDS, "-1")]).is_err());
    }
}
