//! Domain entities held by the persistence layer.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::NotificationKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Mutual friendship; `requester_id` is the user who created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendshipRecord {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub addressee_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FriendshipRecord {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.addressee_id == user_id
    }

    /// The other party, if `user_id` is one of the two.
    pub fn friend_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.requester_id == user_id {
            Some(self.addressee_id)
        } else if self.addressee_id == user_id {
            Some(self.requester_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MessageRecord {
    /// Whether the message was exchanged between `a` and `b`, in either direction.
    pub fn between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.recipient_id == b)
            || (self.sender_id == b && self.recipient_id == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    /// Post, comment or friendship the notification refers to.
    pub subject_id: Uuid,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friendship(a: Uuid, b: Uuid) -> FriendshipRecord {
        FriendshipRecord {
            id: Uuid::new_v4(),
            requester_id: a,
            addressee_id: b,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn friendship_is_symmetric() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let record = friendship(a, b);

        assert_eq!(record.friend_of(a), Some(b));
        assert_eq!(record.friend_of(b), Some(a));
        assert_eq!(record.friend_of(c), None);
        assert!(record.involves(b));
        assert!(!record.involves(c));
    }

    #[test]
    fn message_matches_either_direction() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let message = MessageRecord {
            id: Uuid::new_v4(),
            sender_id: a,
            recipient_id: b,
            content: "hi".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };

        assert!(message.between(a, b));
        assert!(message.between(b, a));
        assert!(!message.between(a, c));
    }
}
