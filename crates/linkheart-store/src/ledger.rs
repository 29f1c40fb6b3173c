//! Swipe ledger: the append-only record of like/skip decisions.

use linkheart_shared::{Decision, UserId, ValidationError};
use tracing::{debug, info};

use crate::error::Result;
use crate::matching::{get_or_create_match, has_reciprocal_like};
use crate::models::{Like, Match, SwipeOutcome, User};
use crate::store::{Batch, Store};
use crate::users::find_user;

impl Store {
    /// Record `from`'s decision about `to`.
    ///
    /// Duplicate decisions are kept.  A like that answers an earlier like from
    /// `to` forms the match in the same atomic write as the swipe itself.
    pub fn record_swipe(
        &self,
        from: &UserId,
        to: &UserId,
        decision: Decision,
    ) -> Result<SwipeOutcome> {
        if from == to {
            return Err(ValidationError::InvalidSwipe.into());
        }

        let (like, formed) = self.write_txn(|store| {
            let users = store.snapshot::<User>()?;
            find_user(&users.items, from)?;
            find_user(&users.items, to)?;

            let mut likes = store.snapshot::<Like>()?;
            let like = Like {
                from_user_id: from.clone(),
                to_user_id: to.clone(),
                decision,
                created_at: store.now(),
            };
            likes.items.push(like.clone());

            let mut batch = Batch::new();
            batch.put(&likes)?;

            let mut formed = None;
            if decision.is_like() && has_reciprocal_like(&likes.items, from, to) {
                let mut matches = store.snapshot::<Match>()?;
                let (m, created) = get_or_create_match(&mut matches.items, from, to, store.now());
                if created {
                    batch.put(&matches)?;
                }
                formed = Some((m, created));
            }

            store.commit(batch)?;
            Ok((like, formed))
        })?;

        debug!(from = %from, to = %to, ?decision, "swipe recorded");

        let matched = formed.map(|(m, created)| self.announce_match(m, created));
        Ok(SwipeOutcome { like, matched })
    }

    /// Whether `viewer` has ever swiped on `target`, either way.
    pub fn has_decided(&self, viewer: &UserId, target: &UserId) -> Result<bool> {
        Ok(self
            .load::<Like>()?
            .iter()
            .any(|l| &l.from_user_id == viewer && &l.to_user_id == target))
    }

    /// Forget every decision `viewer` has made so the feed starts over.
    /// Likes other users made about `viewer` and existing matches are kept.
    pub fn clear_decisions(&self, viewer: &UserId) -> Result<usize> {
        let removed = self.write_txn(|store| {
            let mut likes = store.snapshot::<Like>()?;
            let before = likes.items.len();
            likes.items.retain(|l| &l.from_user_id != viewer);
            let removed = before - likes.items.len();

            if removed > 0 {
                let mut batch = Batch::new();
                batch.put(&likes)?;
                store.commit(batch)?;
            }
            Ok(removed)
        })?;

        info!(viewer = %viewer, removed, "cleared swipe decisions");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::testing::seeded;

    #[test]
    fn self_swipe_is_rejected_and_not_recorded() {
        let (store, _clock) = seeded();
        let a = UserId::from("user_1");

        let err = store.record_swipe(&a, &a, Decision::Like).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidSwipe)
        ));
        assert!(store.load::<Like>().unwrap().is_empty());
    }

    #[test]
    fn skip_marks_decided_without_matching() {
        let (store, _clock) = seeded();
        let a = UserId::from("user_1");
        let b = UserId::from("user_2");

        store.record_swipe(&b, &a, Decision::Like).unwrap();
        let outcome = store.record_swipe(&a, &b, Decision::Skip).unwrap();

        assert!(!outcome.is_match());
        assert!(store.has_decided(&a, &b).unwrap());
        assert!(store.load::<Match>().unwrap().is_empty());
    }

    #[test]
    fn has_decided_is_directional() {
        let (store, _clock) = seeded();
        let a = UserId::from("user_1");
        let b = UserId::from("user_2");

        store.record_swipe(&a, &b, Decision::Like).unwrap();
        assert!(store.has_decided(&a, &b).unwrap());
        assert!(!store.has_decided(&b, &a).unwrap());
    }

    #[test]
    fn duplicate_swipes_accumulate() {
        let (store, _clock) = seeded();
        let a = UserId::from("user_1");
        let b = UserId::from("user_2");

        store.record_swipe(&a, &b, Decision::Skip).unwrap();
        store.record_swipe(&a, &b, Decision::Skip).unwrap();
        assert_eq!(store.load::<Like>().unwrap().len(), 2);
    }

    #[test]
    fn swipe_on_unknown_user_fails() {
        let (store, _clock) = seeded();
        let err = store
            .record_swipe(&"user_1".into(), &"nobody".into(), Decision::Like)
            .unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(_)));
        assert!(store.load::<Like>().unwrap().is_empty());
    }

    #[test]
    fn clear_decisions_only_touches_viewer() {
        let (store, _clock) = seeded();
        let a = UserId::from("user_1");
        let b = UserId::from("user_2");
        let c = UserId::from("user_3");

        store.record_swipe(&a, &b, Decision::Skip).unwrap();
        store.record_swipe(&a, &c, Decision::Like).unwrap();
        store.record_swipe(&b, &a, Decision::Like).unwrap();

        assert_eq!(store.clear_decisions(&a).unwrap(), 2);
        assert!(!store.has_decided(&a, &b).unwrap());
        assert!(store.has_decided(&b, &a).unwrap());
        assert_eq!(store.clear_decisions(&a).unwrap(), 0);
    }
}
