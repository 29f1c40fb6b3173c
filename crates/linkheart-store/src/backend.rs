//! The storage capability the store is built on.
//!
//! A backend holds one opaque blob per [`CollectionKind`] together with a
//! revision counter.  Writes name the revision they were based on so a
//! backend shared by several processes can reject lost updates.

use linkheart_shared::constants::{KEY_LIKES, KEY_MATCHES, KEY_MESSAGES, KEY_USERS};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The four persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Users,
    Likes,
    Matches,
    Messages,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Users,
        CollectionKind::Likes,
        CollectionKind::Matches,
        CollectionKind::Messages,
    ];

    /// Key under which the collection blob is stored.
    pub fn key(self) -> &'static str {
        match self {
            Self::Users => KEY_USERS,
            Self::Likes => KEY_LIKES,
            Self::Matches => KEY_MATCHES,
            Self::Messages => KEY_MESSAGES,
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Users => "users",
            Self::Likes => "likes",
            Self::Matches => "matches",
            Self::Messages => "messages",
        };
        f.write_str(name)
    }
}

/// A collection blob as currently stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub payload: String,
    /// Starts at 1 on first write and increases by one on every write.
    pub revision: u64,
}

/// One collection replacement inside an atomic batch.
#[derive(Debug, Clone)]
pub struct BlobWrite {
    pub kind: CollectionKind,
    pub payload: String,
    /// Revision the payload was derived from; `None` means "must not exist yet".
    pub expected_revision: Option<u64>,
}

pub trait Backend: Send + Sync {
    /// Read the current blob for `kind`, if any has been written.
    fn read(&self, kind: CollectionKind) -> Result<Option<StoredBlob>>;

    /// Apply every write or none of them.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) when
    /// any write's `expected_revision` differs from the stored revision.
    fn write(&self, writes: &[BlobWrite]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            CollectionKind::ALL.iter().map(|k| k.key()).collect();
        assert_eq!(keys.len(), CollectionKind::ALL.len());
        assert_eq!(CollectionKind::Matches.key(), "lh_matches");
    }
}
