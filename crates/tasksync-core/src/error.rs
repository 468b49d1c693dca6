//! Error types for tasksync-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using tasksync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tasksync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local validation failed before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote API could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The remote API answered with an error or an unexpected payload
    #[error("API error: {0}")]
    Api(String),

    /// A remote call did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// A save is already running for this task
    #[error("A save is already in progress")]
    SaveInFlight,

    /// The session was torn down while work was pending
    #[error("Edit session is closed")]
    SessionClosed,

    /// A resolution was requested but no conflict is pending
    #[error("No conflict is pending")]
    NoConflict,

    /// The session has no task loaded yet
    #[error("No task is loaded")]
    NotLoaded,

    /// Local key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this error came from talking to the remote API.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Api(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Api(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_classified() {
        assert!(Error::Network("down".into()).is_transport());
        assert!(Error::Api("bad".into()).is_transport());
        assert!(Error::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!Error::Validation("empty".into()).is_transport());
        assert!(!Error::SaveInFlight.is_transport());
    }
}
