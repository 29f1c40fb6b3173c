//! Candidate feed: who a viewer has not swiped on yet.

use std::collections::HashSet;

use linkheart_shared::UserId;

use crate::error::Result;
use crate::models::{Like, User};
use crate::store::Store;
use crate::users::find_user;

impl Store {
    /// Every other user `viewer` has not decided on, in registration order.
    ///
    /// Empty once the viewer has swiped on everyone; it fills up again when
    /// new users register or the viewer's decisions are cleared.
    pub fn candidates_for(&self, viewer: &UserId) -> Result<Vec<User>> {
        let users = self.load::<User>()?;
        find_user(&users, viewer)?;

        // Users and likes are separate reads, not one snapshot: another process
        // may commit in between.  At worst the feed is one swipe or one
        // registration stale, and the next call catches up.
        let likes = self.load::<Like>()?;
        let decided: HashSet<&UserId> = likes
            .iter()
            .filter(|l| &l.from_user_id == viewer)
            .map(|l| &l.to_user_id)
            .collect();

        Ok(users
            .iter()
            .filter(|u| &u.id != viewer && !decided.contains(&u.id))
            .cloned()
            .collect())
    }
}
