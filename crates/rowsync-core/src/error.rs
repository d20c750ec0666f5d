//! Error types for rowsync

use thiserror::Error;

use crate::EntityKind;

/// Errors raised by store collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected record {id}: {reason}")]
    Rejected { id: String, reason: String },

    #[error("Store conflict: {0}")]
    Conflict(String),
}

/// Errors that abort a reconciliation pass
#[derive(Error, Debug)]
pub enum SyncError {
    /// Feed structure broke; the pass is discarded
    #[error("Malformed feed at row {row}: {reason}")]
    MalformedFeed { row: usize, reason: String },

    #[error("Feed read failed: {0}")]
    FeedIo(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid sync configuration: {0}")]
    Config(String),

    #[error("A {0} pass is already in flight")]
    PassInFlight(EntityKind),
}

impl SyncError {
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        SyncError::MalformedFeed {
            row,
            reason: reason.into(),
        }
    }

    pub fn is_malformed_feed(&self) -> bool {
        matches!(self, SyncError::MalformedFeed { .. })
    }
}

/// Result type for rowsync operations
pub type SyncResult<T> = Result<T, SyncError>;
