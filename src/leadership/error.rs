use std::time::Duration;
use thiserror::Error;

use crate::storage::StorageError;

pub type LeadershipResult<T> = Result<T, ElectionError>;

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("failed to set up membership table: {0}")]
    TableSetup(StorageError),

    #[error("membership table didn't become active within {0:?}")]
    TableTimeout(Duration),

    #[error("failed to register member {id}: {source}")]
    Registration { id: String, source: StorageError },

    #[error("failed to remove stale leader {id}: {source}")]
    RemoveLeader { id: String, source: StorageError },

    #[error("failed to list members: {0}")]
    ListMembers(StorageError),

    #[error("no members are registered")]
    NoCandidates,

    #[error("failed to look up leader {id}: {source}")]
    LeaderLookup { id: String, source: StorageError },

    #[error("failed to send heartbeat for {id}: {source}")]
    Heartbeat { id: String, source: StorageError },

    #[error("leader {id} was removed from the membership table")]
    Evicted { id: String },

    #[error("election was already started")]
    AlreadyStarted,
}

impl ElectionError {
    /// Fatal errors end the election: the process can't participate safely
    /// and should shut down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ElectionError::TableSetup(_)
                | ElectionError::TableTimeout(_)
                | ElectionError::Registration { .. }
                | ElectionError::RemoveLeader { .. }
                | ElectionError::Evicted { .. }
        )
    }

    /// The storage failure behind this error, if there is one.
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            ElectionError::TableSetup(source)
            | ElectionError::ListMembers(source)
            | ElectionError::Registration { source, .. }
            | ElectionError::RemoveLeader { source, .. }
            | ElectionError::LeaderLookup { source, .. }
            | ElectionError::Heartbeat { source, .. } => Some(source),
            ElectionError::TableTimeout(_)
            | ElectionError::NoCandidates
            | ElectionError::Evicted { .. }
            | ElectionError::AlreadyStarted => None,
        }
    }

    /// Short label for logs: the storage error category, or `election`.
    pub fn category(&self) -> &'static str {
        self.storage_error()
            .map_or("election", StorageError::category)
    }
}
