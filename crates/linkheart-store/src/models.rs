//! Domain model structs persisted in the collection blobs.
//!
//! Every struct derives `Serialize` and `Deserialize`; field names are
//! camelCase so the stored blobs and the HTTP API share one shape.

use chrono::{DateTime, Utc};
use linkheart_shared::constants::IMAGE_PLACEHOLDER;
use linkheart_shared::{Decision, Gender, MatchId, MessageId, UserId};
use serde::{Deserialize, Serialize};

use crate::backend::CollectionKind;
use crate::store::Entity;

fn is_false(b: &bool) -> bool {
    !*b
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A profile that can swipe and be swiped on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub location: String,
    pub bio: String,
    /// Display order is preserved; matching ignores it.
    pub interests: Vec<String>,
    /// The first photo is the primary one.
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_admin: bool,
}

impl User {
    pub fn primary_photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }
}

impl Entity for User {
    const KIND: CollectionKind = CollectionKind::Users;
}

/// Registration input.  Anything left out gets the demo defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub name: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub photos: Vec<String>,
}

// ---------------------------------------------------------------------------
// Like
// ---------------------------------------------------------------------------

/// One swipe.  Never modified after it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub decision: Decision,
    pub created_at: DateTime<Utc>,
}

impl Like {
    /// True for a "like" from `from` to `to`.
    pub fn is_like_between(&self, from: &UserId, to: &UserId) -> bool {
        self.decision.is_like() && &self.from_user_id == from && &self.to_user_id == to
    }
}

impl Entity for Like {
    const KIND: CollectionKind = CollectionKind::Likes;
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A mutual like between two users; the gateway to messaging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    /// Unordered pair; stored in the order the match was created with.
    pub users: [UserId; 2],
    pub created_at: DateTime<Utc>,
    /// Preview of the latest message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Bumped on every new message; conversation lists sort on it.
    pub last_activity_at: DateTime<Utc>,
}

impl Match {
    pub fn new(a: UserId, b: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: MatchId::new(),
            users: [a, b],
            created_at: now,
            last_message: None,
            last_activity_at: now,
        }
    }

    pub fn involves(&self, user: &UserId) -> bool {
        self.users.contains(user)
    }

    /// Whether this match links exactly `a` and `b`, in either order.
    pub fn is_pair(&self, a: &UserId, b: &UserId) -> bool {
        (&self.users[0] == a && &self.users[1] == b) || (&self.users[0] == b && &self.users[1] == a)
    }

    /// The other user of the pair, if `user` is one of them.
    pub fn counterpart(&self, user: &UserId) -> Option<&UserId> {
        match &self.users {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }
}

impl Entity for Match {
    const KIND: CollectionKind = CollectionKind::Matches;
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat message inside a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub match_id: MatchId,
    pub sender_id: UserId,
    /// May be empty when an image is attached.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set once the recipient marks the conversation read.
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Text shown in the conversation list for this message.
    pub fn preview(&self) -> &str {
        if self.text.trim().is_empty() {
            IMAGE_PLACEHOLDER
        } else {
            &self.text
        }
    }
}

impl Entity for Message {
    const KIND: CollectionKind = CollectionKind::Messages;
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of recording a swipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwipeOutcome {
    pub like: Like,
    /// Set when this swipe completed a mutual like.
    pub matched: Option<Match>,
}

impl SwipeOutcome {
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// A match as seen by one of its users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "match")]
    pub matched: Match,
    /// `None` if the other profile no longer resolves.
    pub counterpart: Option<User>,
    /// Messages from the counterpart not yet marked read.
    pub unread: usize,
}

/// Collection sizes, for the admin console.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub users: usize,
    pub swipes: usize,
    pub matches: usize,
    pub messages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn match_pair_is_unordered() {
        let m = Match::new("a".into(), "b".into(), at("2024-01-01T00:00:00Z"));
        assert!(m.is_pair(&"a".into(), &"b".into()));
        assert!(m.is_pair(&"b".into(), &"a".into()));
        assert!(!m.is_pair(&"a".into(), &"c".into()));
        assert_eq!(m.counterpart(&"b".into()), Some(&UserId::from("a")));
        assert_eq!(m.counterpart(&"z".into()), None);
    }

    #[test]
    fn image_only_message_previews_placeholder() {
        let msg = Message {
            id: MessageId::new(),
            match_id: MatchId::new(),
            sender_id: "a".into(),
            text: String::new(),
            image_ref: Some("blob:photo".into()),
            created_at: at("2024-01-01T00:00:00Z"),
            read: false,
        };
        assert_eq!(msg.preview(), IMAGE_PLACEHOLDER);
    }

    #[test]
    fn admin_flag_defaults_to_false_and_is_omitted() {
        let json = r#"{"id":"u","name":"N","age":30,"gender":"other","location":"",
                       "bio":"","interests":[],"photos":[]}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(!user.is_admin);
        assert!(!serde_json::to_string(&user).unwrap().contains("isAdmin"));
    }

    #[test]
    fn message_blob_uses_camel_case() {
        let msg = Message {
            id: MessageId::new(),
            match_id: MatchId::new(),
            sender_id: "a".into(),
            text: "hi".into(),
            image_ref: None,
            created_at: at("2024-01-01T00:00:00Z"),
            read: false,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("matchId").is_some());
        assert!(value.get("senderId").is_some());
        assert!(value.get("imageRef").is_none());
        assert_eq!(value["read"], false);
    }
}
