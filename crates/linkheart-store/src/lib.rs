//! # linkheart-store
//!
//! Persistence and matching rules for LinkHeart.
//!
//! Users, likes, matches and messages live in four flat collections, each
//! stored as one JSON blob behind a [`Backend`].  The [`Store`] handle reads
//! and rewrites whole collections and layers the swipe ledger, match
//! formation, conversation log and candidate feed on top of them.  Every
//! mutation runs as a single read-modify-write under the store's writer lock
//! and is committed as one atomic batch.

pub mod backend;
pub mod clock;
pub mod conversation;
pub mod database;
pub mod events;
pub mod feed;
pub mod ledger;
pub mod matching;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod seed;
pub mod store;
pub mod users;

mod error;

pub use backend::{Backend, BlobWrite, CollectionKind, StoredBlob};
pub use clock::{Clock, ManualClock, SystemClock};
pub use database::Database;
pub use error::{Result, StoreError};
pub use events::{Delivery, MatchSubscription, StoreEvent};
pub use memory::MemoryBackend;
pub use models::*;
pub use store::{Entity, LoadMode, Store, StoreConfig};
