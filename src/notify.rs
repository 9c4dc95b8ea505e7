//! Desktop-style notifications for messages in background conversations.
//!
//! The presenter decides *whether* a message deserves a notification (peer
//! authored, conversation not open). [`NotificationGate`] then applies the
//! user's permission before handing it to a [`Notifier`].

use std::sync::Arc;

use tracing::debug;

use crate::model::{Message, UserId, preview};

/// Notification bodies are cut to this many characters.
pub const NOTIFICATION_PREVIEW_CHARS: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub peer_id: UserId,
    pub peer_name: String,
    pub preview: String,
}

impl Notification {
    /// Build from an inbound message; `peer_name` falls back to the sender id.
    #[must_use]
    pub fn for_message(message: &Message, peer_name: Option<&str>) -> Self {
        let peer_name = message
            .sender_name
            .as_deref()
            .or(peer_name)
            .map_or_else(|| message.sender_id.to_string(), ToOwned::to_owned);
        Self {
            peer_id: message.sender_id.clone(),
            peer_name,
            preview: preview(&message.body, NOTIFICATION_PREVIEW_CHARS),
        }
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("New message from {}", self.peer_name)
    }

    /// Replacement tag: a newer notification for the same peer supersedes the old one.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("chat-{}", self.peer_id)
    }
}

/// Display boundary for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Forwards notifications only when permission was granted.
#[derive(Clone)]
pub struct NotificationGate {
    granted: bool,
    notifier: Arc<dyn Notifier>,
}

impl NotificationGate {
    #[must_use]
    pub fn new(granted: bool, notifier: Arc<dyn Notifier>) -> Self {
        Self { granted, notifier }
    }

    /// Returns whether the notification was delivered.
    pub fn deliver(&self, notification: &Notification) -> bool {
        if !self.granted {
            debug!(peer = %notification.peer_id, "notify: permission not granted");
            return false;
        }
        self.notifier.notify(notification);
        true
    }
}

impl std::fmt::Debug for NotificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationGate").field("granted", &self.granted).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
