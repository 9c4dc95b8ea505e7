//! Roster — conversation partners ordered by recency.
//!
//! The server returns the roster already sorted, most recent conversation
//! first. Locally, every accepted message promotes its partner to the front;
//! unread counters and presence are patched in place.
//!
//! A snapshot can be requested before a message arrives and answered after
//! it. Peers touched locally since the last snapshot are therefore replayed
//! on top of each new one: the newer preview wins, the larger unread count
//! wins and the peer goes back to the front.

use time::OffsetDateTime;

use crate::model::{RosterEntry, UserId, preview};

/// Roster previews are cut to this many characters.
pub const ROSTER_PREVIEW_CHARS: usize = 30;

#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    loading: bool,
    /// Peers changed by local messages since the last snapshot, oldest first.
    touched: Vec<UserId>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| &e.user_id == user_id)
    }

    fn get_mut(&mut self, user_id: &UserId) -> Option<&mut RosterEntry> {
        self.entries.iter_mut().find(|e| &e.user_id == user_id)
    }

    /// Display name for `user_id`, falling back to the id itself.
    #[must_use]
    pub fn display_name(&self, user_id: &UserId) -> String {
        self.get(user_id)
            .map_or_else(|| user_id.to_string(), |e| e.display_name.clone())
    }

    /// Mark a roster fetch as started. Returns `false` if one is already running.
    pub fn begin_load(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Mark the running roster fetch as finished, successfully or not.
    pub fn finish_load(&mut self) {
        self.loading = false;
    }

    /// Replace the list with a server snapshot, keeping server order, then
    /// replay local message activity the snapshot may predate.
    pub fn replace(&mut self, snapshot: Vec<RosterEntry>) {
        let mut local = std::mem::replace(&mut self.entries, snapshot);
        for peer in std::mem::take(&mut self.touched) {
            let Some(pos) = local.iter().position(|e| e.user_id == peer) else {
                continue;
            };
            let mine = local.swap_remove(pos);
            match self.get_mut(&peer) {
                Some(theirs) => merge_local(theirs, mine),
                None => self.entries.insert(0, mine),
            }
            self.promote(&peer);
        }
    }

    fn touch(&mut self, peer: &UserId) {
        self.touched.retain(|p| p != peer);
        self.touched.push(peer.clone());
    }

    /// Move `user_id` to the front. Returns `false` if not listed.
    pub fn promote(&mut self, user_id: &UserId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| &e.user_id == user_id) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        true
    }

    /// Record a message exchanged with `peer` and promote it.
    ///
    /// Unknown peers get a new entry named `name`, or their id when absent.
    pub fn record_message(&mut self, peer: &UserId, name: Option<&str>, body: &str, at: OffsetDateTime) {
        if self.get(peer).is_none() {
            let display = name.map_or_else(|| peer.to_string(), ToOwned::to_owned);
            self.entries.insert(0, RosterEntry::new(peer.clone(), display));
        }
        if let Some(entry) = self.get_mut(peer) {
            entry.last_message_preview = Some(preview(body, ROSTER_PREVIEW_CHARS));
            entry.last_message_at = Some(at);
        }
        self.promote(peer);
        self.touch(peer);
    }

    /// Bump the unread counter. Returns the new count (0 if not listed).
    pub fn increment_unread(&mut self, peer: &UserId) -> u32 {
        let Some(entry) = self.get_mut(peer) else {
            return 0;
        };
        entry.unread_count = entry.unread_count.saturating_add(1);
        let count = entry.unread_count;
        self.touch(peer);
        count
    }

    pub fn clear_unread(&mut self, peer: &UserId) {
        if let Some(e) = self.get_mut(peer) {
            e.unread_count = 0;
        }
    }

    /// Update presence. Returns whether the flag changed, or `None` when
    /// `peer` is not listed.
    pub fn set_online(&mut self, peer: &UserId, online: bool) -> Option<bool> {
        let entry = self.get_mut(peer)?;
        let changed = entry.online != online;
        entry.online = online;
        Some(changed)
    }
}

fn merge_local(theirs: &mut RosterEntry, mine: RosterEntry) {
    if mine.last_message_at > theirs.last_message_at {
        theirs.last_message_at = mine.last_message_at;
        theirs.last_message_preview = mine.last_message_preview;
    }
    theirs.unread_count = theirs.unread_count.max(mine.unread_count);
}

#[cfg(test)]
#[path = "roster_test.rs"]
mod tests;
