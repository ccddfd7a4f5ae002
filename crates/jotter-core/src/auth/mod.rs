//! Capability tokens for the remote replica.
//!
//! The remote store only needs [`AuthProvider`]: something that may hand out
//! a token. [`StoredTokenAuth`] backs that with a [`TokenPersistence`] so a
//! token survives restarts; the GitHub client in [`github`] obtains one.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod github;

pub use github::{DeviceCode, GitHubAuthClient, GitHubUser, PollOutcome};

/// Opaque bearer token. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Trimmed token, or `None` when blank.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken([REDACTED])")
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("GitHub OAuth client id is not configured.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Device code expired before authorization completed")]
    DeviceCodeExpired,
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Source of the capability token used by the remote store.
pub trait AuthProvider: Send + Sync {
    fn token(&self) -> Option<AccessToken>;

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

impl<T: AuthProvider + ?Sized> AuthProvider for Arc<T> {
    fn token(&self) -> Option<AccessToken> {
        (**self).token()
    }
}

/// Fixed token, or none. Handy for env-provided tokens and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<AccessToken>);

impl StaticToken {
    #[must_use]
    pub const fn new(token: Option<AccessToken>) -> Self {
        Self(token)
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl AuthProvider for StaticToken {
    fn token(&self) -> Option<AccessToken> {
        self.0.clone()
    }
}

/// Durable token storage, e.g. the OS keychain.
pub trait TokenPersistence: Clone + Send + Sync + 'static {
    fn load_token(&self) -> AuthResult<Option<AccessToken>>;
    fn save_token(&self, token: &AccessToken) -> AuthResult<()>;
    fn clear_token(&self) -> AuthResult<()>;
}

/// [`AuthProvider`] over a persisted token, cached in memory.
pub struct StoredTokenAuth<S: TokenPersistence> {
    store: S,
    cached: RwLock<Option<AccessToken>>,
}

impl<S: TokenPersistence> StoredTokenAuth<S> {
    /// Load whatever token is already persisted.
    pub fn new(store: S) -> AuthResult<Self> {
        let cached = store.load_token()?;
        Ok(Self {
            store,
            cached: RwLock::new(cached),
        })
    }

    pub fn sign_in(&self, token: AccessToken) -> AuthResult<()> {
        self.store.save_token(&token)?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_token()?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl<S: TokenPersistence> AuthProvider for StoredTokenAuth<S> {
    fn token(&self) -> Option<AccessToken> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Human-readable message for a failed GitHub API response.
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<GitHubErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = crate::util::compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct MemoryTokens(Arc<Mutex<Option<AccessToken>>>);

    impl TokenPersistence for MemoryTokens {
        fn load_token(&self) -> AuthResult<Option<AccessToken>> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn save_token(&self, token: &AccessToken) -> AuthResult<()> {
            *self.0.lock().unwrap() = Some(token.clone());
            Ok(())
        }

        fn clear_token(&self) -> AuthResult<()> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
    }

    #[test]
    fn access_token_rejects_blank() {
        assert!(AccessToken::new("   ").is_none());
        assert_eq!(AccessToken::new(" ghp_x ").unwrap().secret(), "ghp_x");
    }

    #[test]
    fn access_token_debug_redacts_secret() {
        let token = AccessToken::new("ghp_supersecret").unwrap();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn stored_token_auth_restores_and_signs_out() {
        let tokens = MemoryTokens::default();
        tokens
            .save_token(&AccessToken::new("persisted").unwrap())
            .unwrap();

        let auth = StoredTokenAuth::new(tokens.clone()).unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(auth.token().unwrap().secret(), "persisted");

        auth.sign_out().unwrap();
        assert!(!auth.is_authenticated());
        assert!(tokens.load_token().unwrap().is_none());
    }

    #[test]
    fn stored_token_auth_sign_in_persists() {
        let tokens = MemoryTokens::default();
        let auth = Arc::new(StoredTokenAuth::new(tokens.clone()).unwrap());
        assert!(!auth.is_authenticated());

        auth.sign_in(AccessToken::new("fresh").unwrap()).unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(tokens.load_token().unwrap().unwrap().secret(), "fresh");
    }

    #[test]
    fn static_token_reports_auth_state() {
        assert!(!StaticToken::anonymous().is_authenticated());
        assert!(StaticToken::new(AccessToken::new("t")).is_authenticated());
    }

    #[test]
    fn parse_api_error_prefers_message() {
        let message = parse_api_error(StatusCode::UNAUTHORIZED, r#"{"message":"Bad credentials"}"#);
        assert_eq!(message, "Bad credentials (401)");
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }
}
