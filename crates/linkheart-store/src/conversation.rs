//! Conversation log: per-match chat history.

use linkheart_shared::{MatchId, MessageId, UserId, ValidationError};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{Match, Message};
use crate::store::{Batch, Store};

impl Store {
    /// Append a message and bump the match's preview and recency.
    ///
    /// The message and the updated match are committed together.  A blank
    /// `image_ref` counts as no image.
    pub fn append_message(
        &self,
        match_id: MatchId,
        sender: &UserId,
        text: &str,
        image_ref: Option<&str>,
    ) -> Result<Message> {
        let image_ref = image_ref
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        if text.trim().is_empty() && image_ref.is_none() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let message = self.write_txn(|store| {
            let mut matches = store.snapshot::<Match>()?;
            let m = matches
                .items
                .iter_mut()
                .find(|m| m.id == match_id)
                .ok_or(StoreError::MatchNotFound(match_id))?;
            if !m.involves(sender) {
                return Err(StoreError::NotAParticipant(sender.clone()));
            }

            let now = store.now();
            let message = Message {
                id: MessageId::new(),
                match_id,
                sender_id: sender.clone(),
                text: text.to_string(),
                image_ref: image_ref.clone(),
                created_at: now,
                read: false,
            };
            m.last_message = Some(message.preview().to_string());
            m.last_activity_at = now;

            let mut messages = store.snapshot::<Message>()?;
            messages.items.push(message.clone());

            let mut batch = Batch::new();
            batch.put(&messages)?;
            batch.put(&matches)?;
            store.commit(batch)?;
            Ok(message)
        })?;

        debug!(match_id = %match_id, sender = %sender, message_id = %message.id, "message appended");
        self.publish(StoreEvent::MessageAppended(message.clone()));
        Ok(message)
    }

    /// Messages of one match, oldest first.  Equal timestamps keep insertion
    /// order.
    pub fn messages_for(&self, match_id: MatchId) -> Result<Vec<Message>> {
        self.get_match(match_id)?;

        let mut messages: Vec<Message> = self
            .load::<Message>()?
            .into_iter()
            .filter(|m| m.match_id == match_id)
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// Mark everything the other participant sent in this match as read by
    /// `reader`.  Returns how many messages changed.
    pub fn mark_read(&self, match_id: MatchId, reader: &UserId) -> Result<usize> {
        let count = self.write_txn(|store| {
            let matches = store.snapshot::<Match>()?;
            let m = matches
                .items
                .iter()
                .find(|m| m.id == match_id)
                .ok_or(StoreError::MatchNotFound(match_id))?;
            if !m.involves(reader) {
                return Err(StoreError::NotAParticipant(reader.clone()));
            }

            let mut messages = store.snapshot::<Message>()?;
            let mut count = 0;
            for msg in messages
                .items
                .iter_mut()
                .filter(|msg| msg.match_id == match_id && &msg.sender_id != reader && !msg.read)
            {
                msg.read = true;
                count += 1;
            }

            if count > 0 {
                let mut batch = Batch::new();
                batch.put(&messages)?;
                store.commit(batch)?;
            }
            Ok(count)
        })?;

        if count > 0 {
            debug!(match_id = %match_id, reader = %reader, count, "messages marked read");
            self.publish(StoreEvent::MessagesRead {
                match_id,
                reader: reader.clone(),
                count,
            });
        }
        Ok(count)
    }
}
