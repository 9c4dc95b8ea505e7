//! Conversation store — in-memory message history per conversation.
//!
//! DESIGN
//! ======
//! One [`ConversationEntry`] per [`ConversationKey`], created lazily on first
//! access and kept for the whole session so re-opening is cheap. Messages are
//! held in ascending `created_at` order; equal timestamps keep arrival order.
//! Every message passes a dedup set first, so redundant pushes of the same
//! server message (echo + reconnect replay, overlapping pages) are stored once.
//!
//! The store does no I/O and knows nothing about which conversation is open.
//! Pagination fields live on the entry but are driven by
//! [`crate::pagination::PaginationController`].

use std::collections::{HashMap, HashSet};

use crate::model::{ConversationKey, DedupKey, Message};

/// Page number of the newest history page.
pub const FIRST_PAGE: u32 = 1;

// =============================================================================
// ENTRY
// =============================================================================

#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub key: ConversationKey,
    messages: Vec<Message>,
    seen: HashSet<DedupKey>,
    /// Whether the server reported older pages beyond the cursor.
    pub has_more_older: bool,
    /// Set while a history page request is in flight.
    pub is_loading_older: bool,
    /// Last history page requested successfully. Starts at 1.
    pub current_page_cursor: u32,
    /// Bumped on every reset; page responses from older generations are stale.
    pub generation: u64,
    /// Page whose last request failed, retried by the next load.
    pub failed_page: Option<u32>,
}

impl ConversationEntry {
    fn new(key: ConversationKey) -> Self {
        Self {
            key,
            messages: Vec::new(),
            seen: HashSet::new(),
            has_more_older: true,
            is_loading_older: false,
            current_page_cursor: FIRST_PAGE,
            generation: 0,
            failed_page: None,
        }
    }

    /// Read-only view of the ordered history.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.seen.clear();
        self.has_more_older = true;
        self.is_loading_older = false;
        self.current_page_cursor = FIRST_PAGE;
        self.generation += 1;
        self.failed_page = None;
    }

    fn insert_live(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.dedup_key()) {
            return false;
        }
        let at = self.messages.partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(at, message);
        true
    }

    fn merge_older(&mut self, page: Vec<Message>) -> usize {
        let mut fresh: Vec<Message> = page
            .into_iter()
            .filter(|m| self.seen.insert(m.dedup_key()))
            .collect();
        if fresh.is_empty() {
            return 0;
        }
        fresh.sort_by_key(|m| m.created_at);
        let added = fresh.len();

        let held = std::mem::take(&mut self.messages);
        let mut merged = Vec::with_capacity(held.len() + added);
        let mut older = fresh.into_iter().peekable();
        for message in held {
            while let Some(o) = older.next_if(|o| o.created_at <= message.created_at) {
                merged.push(o);
            }
            merged.push(message);
        }
        merged.extend(older);
        self.messages = merged;
        added
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct ConversationStore {
    entries: HashMap<ConversationKey, ConversationEntry>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &ConversationKey) -> Option<&ConversationEntry> {
        self.entries.get(key)
    }

    /// Entry for `key`, created on first access.
    pub fn entry_mut(&mut self, key: &ConversationKey) -> &mut ConversationEntry {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| ConversationEntry::new(key.clone()))
    }

    /// Insert a live message. Returns `false` if it was already stored.
    pub fn append(&mut self, key: &ConversationKey, message: Message) -> bool {
        self.entry_mut(key).insert_live(message)
    }

    /// Merge a page of older history in front of what is held.
    /// Returns how many messages were new.
    pub fn prepend_page(&mut self, key: &ConversationKey, page: Vec<Message>) -> usize {
        self.entry_mut(key).merge_older(page)
    }

    /// Owned copy of the ordered history, for rendering.
    #[must_use]
    pub fn messages(&self, key: &ConversationKey) -> Vec<Message> {
        self.entries
            .get(key)
            .map(|e| e.messages.clone())
            .unwrap_or_default()
    }

    /// Clear history and pagination for a fresh open.
    pub fn reset(&mut self, key: &ConversationKey) {
        self.entry_mut(key).reset();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
