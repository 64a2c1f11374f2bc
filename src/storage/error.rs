use thiserror::Error;

/// Errors reported by a storage adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Storage timeout: {0}")]
    Timeout(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound(error.to_string()),
            rusqlite::Error::SqliteFailure(ref failure, _)
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StorageError::Timeout(error.to_string())
            }
            rusqlite::Error::SqliteFailure(_, Some(ref message))
                if message.starts_with("no such table") =>
            {
                StorageError::NotFound(message.clone())
            }
            other => StorageError::Backend(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(error: tokio::task::JoinError) -> Self {
        StorageError::Backend(format!("storage task failed: {}", error))
    }
}

impl StorageError {
    /// Get the error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "not_found",
            StorageError::AlreadyExists(_) => "already_exists",
            StorageError::Unsupported(_) => "unsupported",
            StorageError::InvalidIdentifier(_) => "validation",
            StorageError::Timeout(_) => "timeout",
            StorageError::Backend(_) => "backend",
        }
    }
}
