use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tasksync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Task ID cannot be empty")]
    EmptyTaskId,
    #[error("API key cannot be empty")]
    EmptyApiKey,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Save rejected: {0}")]
    SaveRejected(String),
    #[error("Save failed: {0}. Your changes are kept as a local draft.")]
    SaveFailed(String),
    #[error(
        "No Linear API key for profile '{0}'. Run `tasksync auth login --api-key <key>` or set LINEAR_API_KEY."
    )]
    MissingApiKey(String),
}
