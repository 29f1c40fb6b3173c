use linkheart_shared::{MatchId, UserId, ValidationError};
use thiserror::Error;

use crate::backend::CollectionKind;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Rejected input (self-swipe, empty message).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The sender or reader is not one of the match's two users.
    #[error("User {0} is not a participant of this match")]
    NotAParticipant(UserId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// A collection blob exists but cannot be decoded.
    #[error("Stored {kind} collection is unreadable")]
    StorageCorrupt { kind: CollectionKind },

    /// Another writer committed to the collection since it was read.
    #[error("Concurrent write to the {kind} collection")]
    Conflict { kind: CollectionKind },

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
