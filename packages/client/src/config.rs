//! Connection settings for the occurrence API.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const API_URL_ENV: &str = "DATAPLANE_API_URL";

/// Environment variable overriding [`ClientConfig::token`].
pub const API_TOKEN_ENV: &str = "DATAPLANE_API_TOKEN";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Where and how to reach the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Bearer token. Without one the authentication check reports
    /// disconnected without issuing a request.
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient failures (connection errors, 429, 5xx).
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `DATAPLANE_API_URL` and `DATAPLANE_API_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Applies the environment overrides on top of `self`.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Blank values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = value(API_URL_ENV) {
            self.base_url = url;
        }
        if let Some(token) = value(API_TOKEN_ENV) {
            self.token = Some(token);
        }
        self
    }

    /// Whether a non-blank token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Full URL of `path` under the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_double_slashes() {
        let config = ClientConfig {
            base_url: "http://api.example/api/v1/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.endpoint("/occurrences/coordinates"),
            "http://api.example/api/v1/occurrences/coordinates"
        );
        assert_eq!(config.endpoint("health"), "http://api.example/api/v1/health");
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = ClientConfig::default().with_overrides(|name| match name {
            API_URL_ENV => Some("https://dataplane.example/api/v1".to_string()),
            API_TOKEN_ENV => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://dataplane.example/api/v1");
        assert!(config.has_token());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = ClientConfig::default().with_overrides(|_| Some("  ".to_string()));
        assert_eq!(config, ClientConfig::default());
        assert!(!config.has_token());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.max_retries, 2);
        assert!(config.has_token());
    }
}
