//! Client-side domain types.
//!
//! DESIGN
//! ======
//! Wire payloads from `frames` are converted into these types at the edge so
//! the store, roster and presenter never see raw JSON. A conversation is
//! addressed by an order-independent [`ConversationKey`]; both participants
//! derive the same key no matter who sent a given message.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use frames::{MessageId, UserId};

// =============================================================================
// CONVERSATION KEY
// =============================================================================

/// Canonical (sorted) pair of participants.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    low: UserId,
    high: UserId,
}

impl ConversationKey {
    #[must_use]
    pub fn new(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self { low: a.clone(), high: b.clone() }
        } else {
            Self { low: b.clone(), high: a.clone() }
        }
    }

    #[must_use]
    pub fn participants(&self) -> (&UserId, &UserId) {
        (&self.low, &self.high)
    }

    /// The other participant, if `me` is one of the two.
    #[must_use]
    pub fn peer_of(&self, me: &UserId) -> Option<&UserId> {
        if &self.low == me {
            Some(&self.high)
        } else if &self.high == me {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A received chat message. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id. Older servers omit it on live pushes.
    pub id: Option<MessageId>,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub sender_name: Option<String>,
}

/// Identity used to drop redundant pushes of the same message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Id(MessageId),
    /// Fallback when the server sent no id.
    Content {
        sender_id: UserId,
        receiver_id: UserId,
        created_at: OffsetDateTime,
        body: String,
    },
}

impl Message {
    #[must_use]
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.sender_id, &self.receiver_id)
    }

    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        match &self.id {
            Some(id) => DedupKey::Id(id.clone()),
            None => DedupKey::Content {
                sender_id: self.sender_id.clone(),
                receiver_id: self.receiver_id.clone(),
                created_at: self.created_at,
                body: self.body.clone(),
            },
        }
    }

    /// The participant that is not `me`, or `None` if `me` is not involved.
    #[must_use]
    pub fn peer_of(&self, me: &UserId) -> Option<&UserId> {
        if &self.sender_id == me {
            Some(&self.receiver_id)
        } else if &self.receiver_id == me {
            Some(&self.sender_id)
        } else {
            None
        }
    }
}

impl From<frames::MessagePayload> for Message {
    fn from(p: frames::MessagePayload) -> Self {
        Self {
            id: p.id,
            sender_id: p.sender_id,
            receiver_id: p.receiver_id,
            body: p.message,
            created_at: p.created_at,
            sender_name: p.sender_name,
        }
    }
}

/// Shorten `text` to at most `max_chars` characters, appending `...` when cut.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

// =============================================================================
// ROSTER ENTRY
// =============================================================================

/// One conversation partner as listed in the roster.
///
/// Deserializes from the roster endpoint's records
/// (`id`, `username`, `is_online`, `last_message`, `last_message_time`, `unread_count`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "id")]
    pub user_id: UserId,
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(rename = "is_online", default)]
    pub online: bool,
    #[serde(rename = "last_message", default, deserialize_with = "empty_as_none")]
    pub last_message_preview: Option<String>,
    #[serde(rename = "last_message_time", default, with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub unread_count: u32,
}

impl RosterEntry {
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            online: false,
            last_message_preview: None,
            last_message_at: None,
            unread_count: 0,
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

// =============================================================================
// CONNECTION STATE
// =============================================================================

/// Lifecycle of the single live socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    /// Socket closed or failed; exactly one retry is scheduled.
    ClosedPendingRetry,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::ClosedPendingRetry => "closed (retry pending)",
        })
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
