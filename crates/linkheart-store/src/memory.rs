//! In-process [`Backend`] used by tests and throwaway demo instances.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::backend::{Backend, BlobWrite, CollectionKind, StoredBlob};
use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    blobs: Mutex<HashMap<CollectionKind, StoredBlob>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a blob without a revision check, e.g. to plant corrupt data.
    pub fn put_raw(&self, kind: CollectionKind, payload: impl Into<String>) {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        let revision = blobs.get(&kind).map_or(1, |b| b.revision + 1);
        blobs.insert(
            kind,
            StoredBlob {
                payload: payload.into(),
                revision,
            },
        );
    }
}

impl Backend for MemoryBackend {
    fn read(&self, kind: CollectionKind) -> Result<Option<StoredBlob>> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(&kind).cloned())
    }

    fn write(&self, writes: &[BlobWrite]) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());

        // Check the whole batch before touching anything.
        for w in writes {
            let current = blobs.get(&w.kind).map(|b| b.revision);
            if current != w.expected_revision {
                return Err(StoreError::Conflict { kind: w.kind });
            }
        }

        for w in writes {
            let revision = w.expected_revision.unwrap_or(0) + 1;
            blobs.insert(
                w.kind,
                StoredBlob {
                    payload: w.payload.clone(),
                    revision,
                },
            );
        }
        Ok(())
    }
}
