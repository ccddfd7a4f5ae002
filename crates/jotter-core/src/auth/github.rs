//! GitHub token verification and OAuth device flow.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{parse_api_error, AccessToken, AuthError, AuthResult};
use crate::config::RemoteConfig;

pub(crate) const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
pub(crate) const USER_AGENT: &str = concat!("jotter/", env!("CARGO_PKG_VERSION"));

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_DEVICE_CODE_TTL_SECS: u64 = 900;
const MAX_POLL_INTERVAL_SECS: u64 = 60;
const MAX_DEVICE_CODE_TTL_SECS: u64 = DEFAULT_DEVICE_CODE_TTL_SECS * 4;
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Account the token belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
}

/// Pending device authorization shown to the user.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub interval: Option<u64>,
}

impl DeviceCode {
    /// Server-provided poll interval, capped at one minute.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.interval
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
                .min(MAX_POLL_INTERVAL_SECS),
        )
    }

    /// Server-provided code lifetime, capped at one hour.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(
            self.expires_in
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_DEVICE_CODE_TTL_SECS)
                .min(MAX_DEVICE_CODE_TTL_SECS),
        )
    }
}

impl std::fmt::Debug for DeviceCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DeviceCode")
            .field("device_code", &"[REDACTED]")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("expires_in", &self.expires_in)
            .field("interval", &self.interval)
            .finish()
    }
}

/// What a single poll of the token endpoint told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Granted(AccessToken),
    Pending,
    SlowDown,
    Failed(String),
}

#[derive(Debug, Default, Deserialize)]
struct DeviceTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl DeviceTokenResponse {
    fn into_outcome(self) -> PollOutcome {
        if let Some(token) = self.access_token.and_then(AccessToken::new) {
            return PollOutcome::Granted(token);
        }
        match self.error.as_deref() {
            Some("authorization_pending") => PollOutcome::Pending,
            Some("slow_down") => PollOutcome::SlowDown,
            _ => PollOutcome::Failed(
                self.error_description
                    .or(self.error)
                    .unwrap_or_else(|| "unexpected device flow response".to_string()),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeviceCodeRequest<'a> {
    client_id: &'a str,
    scope: &'a str,
}

#[derive(Debug, Serialize)]
struct DeviceTokenRequest<'a> {
    client_id: &'a str,
    device_code: &'a str,
    grant_type: &'a str,
}

/// Talks to GitHub's REST API and OAuth endpoints.
#[derive(Clone)]
pub struct GitHubAuthClient {
    api_base_url: String,
    oauth_base_url: String,
    client_id: Option<String>,
    scopes: String,
    client: Client,
}

impl GitHubAuthClient {
    pub fn new(config: &RemoteConfig) -> AuthResult<Self> {
        Ok(Self {
            api_base_url: config.api_base_url.clone(),
            oauth_base_url: config.oauth_base_url.clone(),
            client_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
            client: Client::builder().user_agent(USER_AGENT).build()?,
        })
    }

    /// Check a token against `GET /user`.
    pub async fn verify_token(&self, token: &AccessToken) -> AuthResult<GitHubUser> {
        let response = self
            .client
            .get(format!("{}/user", self.api_base_url))
            .header(AUTHORIZATION, format!("token {}", token.secret()))
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<GitHubUser>().await?)
    }

    /// Start the device flow.
    pub async fn request_device_code(&self) -> AuthResult<DeviceCode> {
        let client_id = self.client_id()?;
        let response = self
            .client
            .post(format!("{}/login/device/code", self.oauth_base_url))
            .header(ACCEPT, "application/json")
            .json(&DeviceCodeRequest {
                client_id,
                scope: &self.scopes,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<DeviceCode>().await?)
    }

    /// Poll the token endpoint once.
    pub async fn poll_once(&self, device: &DeviceCode) -> AuthResult<PollOutcome> {
        let client_id = self.client_id()?;
        let response = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_base_url))
            .header(ACCEPT, "application/json")
            .json(&DeviceTokenRequest {
                client_id,
                device_code: &device.device_code,
                grant_type: DEVICE_GRANT_TYPE,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        let payload = response.json::<DeviceTokenResponse>().await?;
        Ok(payload.into_outcome())
    }

    /// Poll until the user approves, declines, or the code expires.
    ///
    /// Waits the server-provided interval after each pending answer and backs
    /// off by five more seconds on every `slow_down`.
    pub async fn poll_for_token(&self, device: &DeviceCode) -> AuthResult<AccessToken> {
        let started = Instant::now();
        let deadline = started.checked_add(device.lifetime()).unwrap_or(started);
        let mut interval = device.poll_interval();

        while Instant::now() < deadline {
            match self.poll_once(device).await? {
                PollOutcome::Granted(token) => return Ok(token),
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => {
                    interval = interval
                        .saturating_add(SLOW_DOWN_STEP)
                        .min(Duration::from_secs(MAX_POLL_INTERVAL_SECS));
                    tracing::debug!("Device flow asked to slow down; interval now {interval:?}");
                }
                PollOutcome::Failed(message) => return Err(AuthError::Api(message)),
            }
            tokio::time::sleep(interval).await;
        }

        Err(AuthError::DeviceCodeExpired)
    }

    fn client_id(&self) -> AuthResult<&str> {
        self.client_id.as_deref().ok_or(AuthError::NotConfigured)
    }
}
