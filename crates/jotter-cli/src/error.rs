use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] jotter_core::Error),
    #[error(transparent)]
    Sync(#[from] jotter_core::SyncFailure),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No memo text provided")]
    EmptyContent,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in. Run `jot auth login` first.")]
    NotSignedIn,
    #[error("Push failed: {0}")]
    PushFailed(String),
    #[error("Refusing to wipe without --yes")]
    WipeNotConfirmed,
}

impl From<jotter_core::auth::AuthError> for CliError {
    fn from(error: jotter_core::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
