//! GitHub token handling for the CLI, persisted in the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use jotter_core::auth::{
    AccessToken, AuthError, AuthProvider, AuthResult, StoredTokenAuth, TokenPersistence,
};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "jotter-cli";

const TOKEN_ENV_VAR: &str = "JOTTER_GITHUB_TOKEN";

#[derive(Clone)]
pub struct KeyringTokenStore {
    username: String,
}

impl KeyringTokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("github_token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl TokenPersistence for KeyringTokenStore {
    #[cfg(not(test))]
    fn load_token(&self) -> AuthResult<Option<AccessToken>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(AccessToken::new(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_token(&self) -> AuthResult<Option<AccessToken>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(guard.get(&self.username).cloned().and_then(AccessToken::new))
    }

    #[cfg(not(test))]
    fn save_token(&self, token: &AccessToken) -> AuthResult<()> {
        self.entry()?
            .set_password(token.secret())
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_token(&self, token: &AccessToken) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), token.secret().to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_token(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_token(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Where the current token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keychain,
}

/// Token provider for one CLI session.
///
/// `JOTTER_GITHUB_TOKEN` wins over the keychain. An offline session has no
/// token at all, which keeps the sync engine away from the network.
pub struct CliAuth {
    env_token: Option<AccessToken>,
    stored: Option<StoredTokenAuth<KeyringTokenStore>>,
}

impl CliAuth {
    pub fn for_profile(profile_name: &str) -> AuthResult<Self> {
        Ok(Self {
            env_token: std::env::var(TOKEN_ENV_VAR).ok().and_then(AccessToken::new),
            stored: Some(StoredTokenAuth::new(KeyringTokenStore::new(profile_name))?),
        })
    }

    pub const fn offline() -> Self {
        Self {
            env_token: None,
            stored: None,
        }
    }

    pub fn source(&self) -> Option<TokenSource> {
        if self.env_token.is_some() {
            Some(TokenSource::Environment)
        } else if self.stored.as_ref().is_some_and(AuthProvider::is_authenticated) {
            Some(TokenSource::Keychain)
        } else {
            None
        }
    }

    pub fn sign_in(&self, token: AccessToken) -> AuthResult<()> {
        match &self.stored {
            Some(stored) => stored.sign_in(token),
            None => Err(AuthError::InvalidConfiguration(
                "cannot sign in while offline",
            )),
        }
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.stored.as_ref().map_or(Ok(()), StoredTokenAuth::sign_out)
    }
}

impl AuthProvider for CliAuth {
    fn token(&self) -> Option<AccessToken> {
        self.env_token
            .clone()
            .or_else(|| self.stored.as_ref().and_then(AuthProvider::token))
    }
}
