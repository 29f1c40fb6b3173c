//! Match formation: reciprocity checks and get-or-create on user pairs.

use linkheart_shared::{MatchId, UserId, ValidationError};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{Conversation, Like, Match, Message, User};
use crate::store::{Batch, Store};
use crate::users::find_user;

/// Whether `target` has liked `actor`.  Linear in the number of swipes.
pub(crate) fn has_reciprocal_like(likes: &[Like], actor: &UserId, target: &UserId) -> bool {
    likes.iter().any(|l| l.is_like_between(target, actor))
}

/// Find the match for `{a, b}` or append a new one.  The flag is `true` when
/// the match was created by this call.
pub(crate) fn get_or_create_match(
    matches: &mut Vec<Match>,
    a: &UserId,
    b: &UserId,
    now: chrono::DateTime<chrono::Utc>,
) -> (Match, bool) {
    if let Some(existing) = matches.iter().find(|m| m.is_pair(a, b)) {
        return (existing.clone(), false);
    }
    let created = Match::new(a.clone(), b.clone(), now);
    matches.push(created.clone());
    (created, true)
}

impl Store {
    /// Form the `actor`/`target` match if `target` already liked `actor`.
    pub fn try_form_match(&self, actor: &UserId, target: &UserId) -> Result<Option<Match>> {
        if actor == target {
            return Err(ValidationError::InvalidSwipe.into());
        }

        let formed = self.write_txn(|store| {
            let likes = store.snapshot::<Like>()?;
            if !has_reciprocal_like(&likes.items, actor, target) {
                return Ok(None);
            }
            store.get_or_create_locked(actor, target).map(Some)
        })?;

        Ok(formed.map(|(m, created)| self.announce_match(m, created)))
    }

    /// Return the match for the pair, creating it if needed.
    ///
    /// Repeated calls, in either argument order, return the same match.
    pub fn create_match(&self, a: &UserId, b: &UserId) -> Result<Match> {
        if a == b {
            return Err(ValidationError::InvalidSwipe.into());
        }

        let (m, created) = self.write_txn(|store| {
            let users = store.snapshot::<User>()?;
            find_user(&users.items, a)?;
            find_user(&users.items, b)?;
            store.get_or_create_locked(a, b)
        })?;

        Ok(self.announce_match(m, created))
    }

    pub fn get_match(&self, id: MatchId) -> Result<Match> {
        self.load::<Match>()?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or(StoreError::MatchNotFound(id))
    }

    /// Matches involving `user`, most recently active first.
    pub fn matches_for_user(&self, user: &UserId) -> Result<Vec<Match>> {
        let users = self.load::<User>()?;
        find_user(&users, user)?;

        let mut matches: Vec<Match> = self
            .load::<Match>()?
            .into_iter()
            .filter(|m| m.involves(user))
            .collect();
        matches.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(matches)
    }

    /// [`matches_for_user`](Self::matches_for_user) with the other profile
    /// and the unread count attached.
    pub fn conversations_for(&self, user: &UserId) -> Result<Vec<Conversation>> {
        let matches = self.matches_for_user(user)?;
        let users = self.load::<User>()?;
        let messages = self.load::<Message>()?;

        Ok(matches
            .into_iter()
            .map(|m| {
                let counterpart = m
                    .counterpart(user)
                    .and_then(|other| users.iter().find(|u| &u.id == other))
                    .cloned();
                let unread = messages
                    .iter()
                    .filter(|msg| msg.match_id == m.id && !msg.read && &msg.sender_id != user)
                    .count();
                Conversation {
                    matched: m,
                    counterpart,
                    unread,
                }
            })
            .collect())
    }

    /// Get-or-create inside an open write transaction.
    fn get_or_create_locked(&self, a: &UserId, b: &UserId) -> Result<(Match, bool)> {
        let mut matches = self.snapshot::<Match>()?;
        let (m, created) = get_or_create_match(&mut matches.items, a, b, self.now());
        if created {
            let mut batch = Batch::new();
            batch.put(&matches)?;
            self.commit(batch)?;
        }
        Ok((m, created))
    }

    pub(crate) fn announce_match(&self, m: Match, created: bool) -> Match {
        if created {
            info!(match_id = %m.id, a = %m.users[0], b = %m.users[1], "match formed");
            self.publish(StoreEvent::MatchFormed(m.clone()));
        }
        m
    }
}
