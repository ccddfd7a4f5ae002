//! Client configuration for the remote replica and GitHub auth.
//!
//! `ClientConfig` is the raw, all-optional form stored in CLI profiles and
//! read from the environment. [`ClientConfig::resolve`] validates it and fills
//! in defaults, producing the [`RemoteConfig`] the stores and auth client use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_OAUTH_BASE_URL: &str = "https://github.com";
pub const DEFAULT_GIST_FILE_NAME: &str = "memo.json";
pub const DEFAULT_GIST_DESCRIPTION: &str = "Memo App Data";
pub const DEFAULT_OAUTH_SCOPES: &str = "gist";
pub const DEFAULT_PUSH_DEBOUNCE_MS: u64 = 3_000;

/// User-editable configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub github_api_base_url: Option<String>,
    #[serde(default)]
    pub github_oauth_base_url: Option<String>,
    /// OAuth app client id; required only for the device flow
    #[serde(default)]
    pub github_client_id: Option<String>,
    #[serde(default)]
    pub gist_file_name: Option<String>,
    #[serde(default)]
    pub gist_description: Option<String>,
    #[serde(default)]
    pub push_debounce_ms: Option<u64>,
}

impl ClientConfig {
    /// Overlay `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merged_with(self, other: Self) -> Self {
        Self {
            github_api_base_url: other.github_api_base_url.or(self.github_api_base_url),
            github_oauth_base_url: other.github_oauth_base_url.or(self.github_oauth_base_url),
            github_client_id: other.github_client_id.or(self.github_client_id),
            gist_file_name: other.gist_file_name.or(self.gist_file_name),
            gist_description: other.gist_description.or(self.gist_description),
            push_debounce_ms: other.push_debounce_ms.or(self.push_debounce_ms),
        }
    }

    /// Validate and fill in defaults.
    pub fn resolve(&self) -> Result<RemoteConfig> {
        let api_base_url = resolve_url(
            self.github_api_base_url.clone(),
            DEFAULT_GITHUB_API_BASE_URL,
            "github_api_base_url",
        )?;
        let oauth_base_url = resolve_url(
            self.github_oauth_base_url.clone(),
            DEFAULT_GITHUB_OAUTH_BASE_URL,
            "github_oauth_base_url",
        )?;

        let file_name = normalize_text_option(self.gist_file_name.clone())
            .unwrap_or_else(|| DEFAULT_GIST_FILE_NAME.to_string());
        if file_name.contains('/') {
            return Err(Error::InvalidInput(format!(
                "gist_file_name must not contain '/': {file_name}"
            )));
        }

        let debounce_ms = self.push_debounce_ms.unwrap_or(DEFAULT_PUSH_DEBOUNCE_MS);
        if debounce_ms == 0 {
            return Err(Error::InvalidInput(
                "push_debounce_ms must be greater than zero".to_string(),
            ));
        }

        Ok(RemoteConfig {
            api_base_url,
            oauth_base_url,
            client_id: normalize_text_option(self.github_client_id.clone()),
            scopes: DEFAULT_OAUTH_SCOPES.to_string(),
            file_name,
            description: normalize_text_option(self.gist_description.clone())
                .unwrap_or_else(|| DEFAULT_GIST_DESCRIPTION.to_string()),
            push_debounce: Duration::from_millis(debounce_ms),
        })
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_base_url: String,
    pub oauth_base_url: String,
    pub client_id: Option<String>,
    pub scopes: String,
    pub file_name: String,
    pub description: String,
    pub push_debounce: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_GITHUB_API_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_GITHUB_OAUTH_BASE_URL.to_string(),
            client_id: None,
            scopes: DEFAULT_OAUTH_SCOPES.to_string(),
            file_name: DEFAULT_GIST_FILE_NAME.to_string(),
            description: DEFAULT_GIST_DESCRIPTION.to_string(),
            push_debounce: Duration::from_millis(DEFAULT_PUSH_DEBOUNCE_MS),
        }
    }
}

impl RemoteConfig {
    /// Default configuration pointed at a different API host, e.g. a test
    /// server. The OAuth host follows the API host.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            api_base_url: base_url.clone(),
            oauth_base_url: base_url,
            ..Self::default()
        }
    }
}

fn resolve_url(value: Option<String>, default: &str, field: &str) -> Result<String> {
    let Some(url) = normalize_text_option(value) else {
        return Ok(default.to_string());
    };
    if !is_http_url(&url) {
        return Err(Error::InvalidInput(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}
