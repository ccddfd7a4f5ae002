//! Error types for jotter-core

use thiserror::Error;

/// Result type alias using jotter-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in jotter-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or rejected capability token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Remote responded with something other than success or not-found
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed persisted data
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification used by the sync engine to pick a failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Network,
    Storage,
    Decode,
    InvalidInput,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Network(_) | Self::Http(_) => ErrorKind::Network,
            Self::Storage(_) | Self::LibSql(_) | Self::Io(_) => ErrorKind::Storage,
            Self::Decode(_) => ErrorKind::Decode,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Auth and network failures are the ones a caller can act on by
    /// logging in again or waiting for connectivity.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.kind(), ErrorKind::Auth | ErrorKind::Network)
    }

    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self.kind(), ErrorKind::Decode)
    }
}
