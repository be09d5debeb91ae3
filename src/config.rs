use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::capabilities::{BaseUrl, UrlError};
use crate::{DEFAULT_NOTIFICATION_MS, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, MIN_SEARCH_QUERY_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("maximum search limit must be at least 1")]
    ZeroMaxLimit,

    #[error("search limit {limit} is outside 1..={max}")]
    SearchLimit { limit: u32, max: u32 },

    #[error("minimum query length must be at least 1")]
    ZeroQueryLength,
}

/// Runtime settings the shell hands to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: BaseUrl,
    pub search_limit: u32,
    pub max_search_limit: u32,
    pub min_query_len: usize,
    pub notification_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: BaseUrl::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_search_limit: MAX_SEARCH_LIMIT,
            min_query_len: MIN_SEARCH_QUERY_LEN,
            notification_ms: DEFAULT_NOTIFICATION_MS,
        }
    }
}

/// Partial configuration; absent fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub search_limit: Option<u32>,
    pub max_search_limit: Option<u32>,
    pub min_query_len: Option<usize>,
    pub notification_ms: Option<u64>,
}

impl ApiConfig {
    /// Builds a new config from `self` plus overrides. Nothing is applied
    /// unless every field validates.
    pub fn apply(&self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let base_url = match &overrides.base_url {
            Some(url) => BaseUrl::new(url.as_str())?,
            None => self.base_url.clone(),
        };

        let max_search_limit = overrides.max_search_limit.unwrap_or(self.max_search_limit);
        if max_search_limit == 0 {
            return Err(ConfigError::ZeroMaxLimit);
        }

        let search_limit = overrides.search_limit.unwrap_or(self.search_limit);
        if search_limit == 0 || search_limit > max_search_limit {
            return Err(ConfigError::SearchLimit {
                limit: search_limit,
                max: max_search_limit,
            });
        }

        let min_query_len = overrides.min_query_len.unwrap_or(self.min_query_len);
        if min_query_len == 0 {
            return Err(ConfigError::ZeroQueryLength);
        }

        let config = Self {
            base_url,
            search_limit,
            max_search_limit,
            min_query_len,
            notification_ms: overrides.notification_ms.unwrap_or(self.notification_ms),
        };

        info!(base_url = config.base_url.as_str(), "configuration applied");
        Ok(config)
    }

    pub fn clamp_limit(&self, limit: u32) -> u32 {
        limit.clamp(1, self.max_search_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080");
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.max_search_limit, 100);
        assert_eq!(config.min_query_len, 2);
        assert_eq!(config.notification_ms, 3000);
    }

    #[test]
    fn test_apply_partial() {
        let overrides: ConfigOverrides =
            serde_json::from_str(r#"{"baseUrl": "https://api.yeh.example", "notificationMs": 5000}"#)
                .unwrap();
        let config = ApiConfig::default().apply(&overrides).unwrap();
        assert_eq!(config.base_url.host(), "api.yeh.example");
        assert_eq!(config.notification_ms, 5000);
        assert_eq!(config.search_limit, 50);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let overrides = ConfigOverrides {
            base_url: Some("ftp://files.example".into()),
            ..ConfigOverrides::default()
        };
        assert!(matches!(
            ApiConfig::default().apply(&overrides),
            Err(ConfigError::InvalidUrl(UrlError::Scheme(_)))
        ));
    }

    #[test]
    fn test_limit_validation() {
        let overrides = ConfigOverrides {
            search_limit: Some(150),
            ..ConfigOverrides::default()
        };
        assert_eq!(
            ApiConfig::default().apply(&overrides),
            Err(ConfigError::SearchLimit { limit: 150, max: 100 })
        );

        let overrides = ConfigOverrides {
            max_search_limit: Some(0),
            ..ConfigOverrides::default()
        };
        assert_eq!(ApiConfig::default().apply(&overrides), Err(ConfigError::ZeroMaxLimit));
    }

    #[test]
    fn test_clamp_limit() {
        let config = ApiConfig::default();
        assert_eq!(config.clamp_limit(0), 1);
        assert_eq!(config.clamp_limit(40), 40);
        assert_eq!(config.clamp_limit(500), 100);
    }
}
