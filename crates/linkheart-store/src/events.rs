//! Change notifications.
//!
//! Every committed match, message and read receipt is broadcast to
//! subscribers.  A [`MatchSubscription`] narrows the stream to one
//! conversation; dropping it cancels the subscription.

use linkheart_shared::{MatchId, UserId};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::error::Result;
use crate::models::{Match, Message};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StoreEvent {
    MatchFormed(Match),
    MessageAppended(Message),
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        match_id: MatchId,
        reader: UserId,
        count: usize,
    },
}

impl StoreEvent {
    pub fn match_id(&self) -> MatchId {
        match self {
            Self::MatchFormed(m) => m.id,
            Self::MessageAppended(msg) => msg.match_id,
            Self::MessagesRead { match_id, .. } => *match_id,
        }
    }

    /// Short name used as the event type on streaming transports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MatchFormed(_) => "match",
            Self::MessageAppended(_) => "message",
            Self::MessagesRead { .. } => "read",
        }
    }
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Event(StoreEvent),
    /// The subscriber fell behind and this many events were dropped.
    Lagged(u64),
}

pub struct MatchSubscription {
    match_id: MatchId,
    rx: broadcast::Receiver<StoreEvent>,
}

impl MatchSubscription {
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Wait for the next event of this match.  `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.match_id() == self.match_id => {
                    return Some(Delivery::Event(event))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(match_id = %self.match_id, missed, "subscriber lagged");
                    return Some(Delivery::Lagged(missed));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Store {
    /// Follow one conversation.  Only events committed after this call are
    /// delivered.
    pub fn watch_match(&self, match_id: MatchId) -> Result<MatchSubscription> {
        self.get_match(match_id)?;
        Ok(MatchSubscription {
            match_id,
            rx: self.subscribe(),
        })
    }
}
