use crate::domain::message::Message;
use crate::domain::user::UserId;
use time::OffsetDateTime;

pub type ConversationId = i64;

/// An unordered pair of distinct users, stored with the lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: UserId,
    high: UserId,
}

impl ParticipantPair {
    /// Returns `None` when both ids are the same user.
    #[must_use]
    pub fn new(a: UserId, b: UserId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    #[must_use]
    pub const fn low(&self) -> UserId {
        self.low
    }

    #[must_use]
    pub const fn high(&self) -> UserId {
        self.high
    }

    #[must_use]
    pub const fn contains(&self, user_id: UserId) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The participant that is not `user_id`, if `user_id` is one of the pair.
    #[must_use]
    pub const fn other(&self, user_id: UserId) -> Option<UserId> {
        if self.low == user_id {
            Some(self.high)
        } else if self.high == user_id {
            Some(self.low)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> [UserId; 2] {
        [self.low, self.high]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: ParticipantPair,
    pub created_at: OffsetDateTime,
    pub last_message_at: OffsetDateTime,
}

impl Conversation {
    #[must_use]
    pub const fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(user_id)
    }
}

/// Result of an idempotent conversation insert.
#[derive(Debug, Clone)]
pub enum ConversationCreation {
    Created { conversation: Conversation, message: Message },
    Existing(Conversation),
}

/// A conversation as seen from one participant's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub other_user_id: UserId,
    pub other_display_name: String,
    pub other_deleted: bool,
    pub last_message_at: OffsetDateTime,
    pub last_message_preview: Option<String>,
    pub unread_count: i64,
}
