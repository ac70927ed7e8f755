use thiserror::Error;

use crate::storage::DurableError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request payload could not be decoded; nothing was mutated.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Truncate, write or encode of the backing file failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] DurableError),
    /// Backing file could not be opened or decoded at load time.
    #[error("startup failure: {0}")]
    Startup(#[source] DurableError),
    /// A request sub-task panicked before finishing.
    #[error("task failure: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
