//! Wire model and JSON codec for the chat socket.
//!
//! This crate owns the representation exchanged with the message-delivery
//! service. Every socket frame is a tagged envelope `{"type": ..., "data": ...}`.
//! Inbound envelopes decode into [`InboundEvent`]; unknown `type` values decode
//! to [`InboundEvent::Unknown`] instead of failing so newer servers never break
//! older clients.
//!
//! Identifiers are opaque. The service emits them as JSON strings on some paths
//! and as numbers on others, so [`UserId`] and [`MessageId`] accept both and
//! always re-encode as strings.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

// =============================================================================
// EVENT TYPE NAMES
// =============================================================================

/// Inbound: a message was delivered (or echoed back to its sender).
pub const NEW_MESSAGE: &str = "new_message";

/// Inbound and outbound: typing indicator.
pub const TYPING: &str = "typing";

/// Inbound: a user went online or offline.
pub const USER_STATUS: &str = "user_status";

/// Inbound: the server asks clients to re-fetch their roster.
pub const FORCE_REFRESH: &str = "force_refresh";

/// Outbound: send a message to a peer.
pub const CHAT_MESSAGE: &str = "chat_message";

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_event`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not a JSON object with a string `type` field.
    #[error("invalid frame envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    /// The envelope named a known event but its `data` did not match.
    #[error("malformed `{kind}` payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }
    };
}

opaque_id!(
    /// Participant identifier. `42` and `"42"` on the wire are the same user.
    UserId
);

opaque_id!(
    /// Server-assigned message identifier, used for de-duplication.
    MessageId
);

// =============================================================================
// PAYLOADS
// =============================================================================

/// A chat message as carried by `new_message` frames and history pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

/// Payload of an inbound `typing` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingPayload {
    pub user_id: UserId,
    pub is_typing: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Payload of an inbound `user_status` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub user_id: UserId,
    pub is_online: bool,
    #[serde(default)]
    pub username: Option<String>,
}

// =============================================================================
// EVENTS
// =============================================================================

/// A decoded server-to-client frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    NewMessage(MessagePayload),
    Typing(TypingPayload),
    UserStatus(StatusPayload),
    ForceRefresh,
    /// Any `type` this client does not understand. Callers ignore it.
    Unknown(String),
}

impl InboundEvent {
    /// The wire `type` this event was decoded from.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::NewMessage(_) => NEW_MESSAGE,
            Self::Typing(_) => TYPING,
            Self::UserStatus(_) => USER_STATUS,
            Self::ForceRefresh => FORCE_REFRESH,
            Self::Unknown(kind) => kind,
        }
    }
}

/// A client-to-server frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    ChatMessage { receiver_id: UserId, message: String },
    Typing { receiver_id: UserId, is_typing: bool },
}

impl OutboundEvent {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => CHAT_MESSAGE,
            Self::Typing { .. } => TYPING,
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns [`CodecError::Envelope`] when the text is not a tagged envelope and
/// [`CodecError::Payload`] when a recognized event carries malformed `data`.
/// Unrecognized event types are not errors.
pub fn decode_event(text: &str) -> Result<InboundEvent, CodecError> {
    let Envelope { kind, data } = serde_json::from_str(text).map_err(CodecError::Envelope)?;

    let event = match kind.as_str() {
        NEW_MESSAGE => InboundEvent::NewMessage(payload(NEW_MESSAGE, data)?),
        TYPING => InboundEvent::Typing(payload(TYPING, data)?),
        USER_STATUS => InboundEvent::UserStatus(payload(USER_STATUS, data)?),
        FORCE_REFRESH => InboundEvent::ForceRefresh,
        other => InboundEvent::Unknown(other.to_owned()),
    };
    Ok(event)
}

fn payload<T>(kind: &'static str, data: Value) -> Result<T, CodecError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(data).map_err(|source| CodecError::Payload { kind, source })
}

/// Encode an outbound frame as JSON text.
#[must_use]
pub fn encode_event(event: &OutboundEvent) -> String {
    // Serializing plain strings and bools into a String cannot fail.
    serde_json::to_string(event).unwrap_or_default()
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
