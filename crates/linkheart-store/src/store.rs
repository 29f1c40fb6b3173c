//! The [`Store`] handle: typed access to the collections plus the writer
//! discipline every mutating operation goes through.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use linkheart_shared::constants::{DEFAULT_EVENT_CAPACITY, MAX_CONFLICT_RETRIES};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::backend::{Backend, BlobWrite, CollectionKind};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::memory::MemoryBackend;
use crate::models::{Like, Match, Message, StoreStats, User};

/// A model persisted as one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: CollectionKind;
}

/// What to do with a collection blob that no longer parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Fail with [`StoreError::StorageCorrupt`].
    #[default]
    Strict,
    /// Log it and treat the collection as empty.  The next write to that
    /// collection replaces the bad blob.
    Lenient,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub load_mode: LoadMode,
    pub event_capacity: usize,
    /// Write the demo dataset into any collection that does not exist yet.
    pub seed_if_empty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            load_mode: LoadMode::Strict,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            seed_if_empty: true,
        }
    }
}

/// A collection read at a known revision.
pub(crate) struct Snapshot<T> {
    pub items: Vec<T>,
    revision: Option<u64>,
}

/// Collection writes committed together.
#[derive(Default)]
pub(crate) struct Batch {
    writes: Vec<BlobWrite>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `snapshot` to replace its collection, based on the revision it was read at.
    pub fn put<T: Entity>(&mut self, snapshot: &Snapshot<T>) -> Result<()> {
        self.put_items(&snapshot.items, snapshot.revision)
    }

    pub fn put_items<T: Entity>(
        &mut self,
        items: &[T],
        expected_revision: Option<u64>,
    ) -> Result<()> {
        self.writes.push(BlobWrite {
            kind: T::KIND,
            payload: serde_json::to_string(items)?,
            expected_revision,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Shared handle over the four collections.
///
/// Cheap operations only: every call reads the blobs it needs, and mutations
/// rewrite whole collections.  The handle is `Send + Sync`; wrap it in an
/// `Arc` to share it.
pub struct Store {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write sequences within this process.
    writer: Mutex<()>,
    events: broadcast::Sender<StoreEvent>,
    load_mode: LoadMode,
}

impl Store {
    /// Open a store over `backend`, using wall-clock time.
    pub fn open(backend: Arc<dyn Backend>, config: StoreConfig) -> Result<Self> {
        Self::with_clock(backend, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        backend: Arc<dyn Backend>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let store = Self {
            backend,
            clock,
            writer: Mutex::new(()),
            events,
            load_mode: config.load_mode,
        };

        if config.seed_if_empty {
            store.seed_missing()?;
        }

        Ok(store)
    }

    /// A seeded store that lives only as long as the handle.
    pub fn in_memory() -> Result<Self> {
        Self::open(Arc::new(MemoryBackend::new()), StoreConfig::default())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Every record of one kind, in stored order.
    pub fn load<T: Entity>(&self) -> Result<Vec<T>> {
        Ok(self.snapshot::<T>()?.items)
    }

    /// Replace a whole collection.
    pub fn save<T: Entity>(&self, items: &[T]) -> Result<()> {
        self.write_txn(|store| {
            let revision = store.snapshot::<T>()?.revision;
            let mut batch = Batch::new();
            batch.put_items(items, revision)?;
            store.commit(batch)
        })
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.load::<User>()?.len(),
            swipes: self.load::<Like>()?.len(),
            matches: self.load::<Match>()?.len(),
            messages: self.load::<Message>()?.len(),
        })
    }

    pub(crate) fn snapshot<T: Entity>(&self) -> Result<Snapshot<T>> {
        let Some(blob) = self.backend.read(T::KIND)? else {
            return Ok(Snapshot {
                items: Vec::new(),
                revision: None,
            });
        };

        match serde_json::from_str::<Vec<T>>(&blob.payload) {
            Ok(items) => Ok(Snapshot {
                items,
                revision: Some(blob.revision),
            }),
            Err(e) => match self.load_mode {
                LoadMode::Strict => {
                    error!(kind = %T::KIND, error = %e, "collection blob is unreadable");
                    Err(StoreError::StorageCorrupt { kind: T::KIND })
                }
                LoadMode::Lenient => {
                    warn!(kind = %T::KIND, error = %e, "discarding unreadable collection blob");
                    Ok(Snapshot {
                        items: Vec::new(),
                        revision: Some(blob.revision),
                    })
                }
            },
        }
    }

    pub(crate) fn commit(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.backend.write(&batch.writes)
    }

    /// Run one read-modify-write under the writer lock.
    ///
    /// `op` must read everything it depends on itself: when another process
    /// wins the race the backend reports a conflict and `op` is re-run from
    /// scratch against the fresh state.
    pub(crate) fn write_txn<R>(&self, mut op: impl FnMut(&Self) -> Result<R>) -> Result<R> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut attempt = 0;
        loop {
            match op(self) {
                Err(StoreError::Conflict { kind }) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    warn!(%kind, attempt, "concurrent write detected, retrying");
                }
                result => return result,
            }
        }
    }

    pub(crate) fn publish(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Every event the store emits.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clock::ManualClock;

    pub fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Seeded in-memory store driven by a manual clock.
    pub fn seeded() -> (Store, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Store::with_clock(
            Arc::new(MemoryBackend::new()),
            clock.clone(),
            StoreConfig::default(),
        )
        .unwrap();
        (store, clock)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use linkheart_shared::UserId;

    use super::testing::seeded;
    use super::*;
    use crate::backend::StoredBlob;

    #[test]
    fn strict_mode_reports_corrupt_blob() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::open(backend.clone(), StoreConfig::default()).unwrap();
        backend.put_raw(CollectionKind::Likes, "{not json");

        let err = store.load::<Like>().unwrap_err();
        assert!(matches!(
            err,
            StoreError::StorageCorrupt {
                kind: CollectionKind::Likes
            }
        ));
    }

    #[test]
    fn lenient_mode_reads_corrupt_blob_as_empty_and_overwrites_it() {
        let backend = Arc::new(MemoryBackend::new());
        let config = StoreConfig {
            load_mode: LoadMode::Lenient,
            ..StoreConfig::default()
        };
        let store = Store::open(backend.clone(), config).unwrap();
        backend.put_raw(CollectionKind::Likes, "garbage");

        assert!(store.load::<Like>().unwrap().is_empty());

        store
            .record_swipe(&"user_1".into(), &"user_2".into(), linkheart_shared::Decision::Skip)
            .unwrap();
        assert_eq!(store.load::<Like>().unwrap().len(), 1);
    }

    #[test]
    fn save_replaces_collection() {
        let (store, _clock) = seeded();
        let mut users = store.load::<User>().unwrap();
        users.truncate(2);
        store.save(&users).unwrap();
        assert_eq!(store.load::<User>().unwrap(), users);
    }

    #[test]
    fn stats_count_each_collection() {
        let (store, _clock) = seeded();
        store
            .record_swipe(&"user_1".into(), &"user_2".into(), linkheart_shared::Decision::Like)
            .unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                users: 5,
                swipes: 1,
                matches: 0,
                messages: 0
            }
        );
    }

    /// Simulates a second process that creates the same match between our
    /// read and our write.
    struct RacingBackend {
        inner: MemoryBackend,
        armed: AtomicBool,
        rival: Match,
    }

    impl Backend for RacingBackend {
        fn read(&self, kind: CollectionKind) -> Result<Option<StoredBlob>> {
            self.inner.read(kind)
        }

        fn write(&self, writes: &[BlobWrite]) -> Result<()> {
            let touches_matches = writes.iter().any(|w| w.kind == CollectionKind::Matches);
            if touches_matches && self.armed.swap(false, Ordering::SeqCst) {
                let current = self.inner.read(CollectionKind::Matches)?;
                self.inner.write(&[BlobWrite {
                    kind: CollectionKind::Matches,
                    payload: serde_json::to_string(&vec![self.rival.clone()])?,
                    expected_revision: current.map(|b| b.revision),
                }])?;
            }
            self.inner.write(writes)
        }
    }

    #[test]
    fn conflicting_writer_does_not_duplicate_match() {
        let a = UserId::from("user_1");
        let b = UserId::from("user_3");
        let rival = Match::new(b.clone(), a.clone(), Utc::now());
        let backend = Arc::new(RacingBackend {
            inner: MemoryBackend::new(),
            armed: AtomicBool::new(false),
            rival: rival.clone(),
        });
        let store = Store::open(backend.clone(), StoreConfig::default()).unwrap();
        backend.armed.store(true, Ordering::SeqCst);

        let m = store.create_match(&a, &b).unwrap();

        assert_eq!(m.id, rival.id);
        assert_eq!(store.load::<Match>().unwrap().len(), 1);
    }
}
