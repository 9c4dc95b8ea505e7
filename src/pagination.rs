//! Pagination controller — guarded backward history loads.
//!
//! DESIGN
//! ======
//! Each conversation entry carries `is_loading_older`, `has_more_older` and a
//! page cursor. [`PaginationController::load_older`] is the mutual-exclusion
//! boundary: while a request is in flight, or once history is exhausted, it
//! returns `None` and no request is issued. Scroll signals are additionally
//! rate limited by [`ScrollThrottle`], but the guard holds without it.
//!
//! Requests are tagged with the entry generation. Re-opening a conversation
//! resets the entry and bumps the generation, so a response for a request
//! issued before the reset is recognised as stale and dropped.
//!
//! A failed request (error or timeout) clears the in-flight flag and records
//! the page, so the next load retries the same page instead of skipping it.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::model::{ConversationKey, Message, UserId};
use crate::store::{ConversationStore, FIRST_PAGE};

// =============================================================================
// TYPES
// =============================================================================

/// One history request issued by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub key: ConversationKey,
    pub peer: UserId,
    pub page: u32,
    pub generation: u64,
}

/// One page of history as returned by the message source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Oldest first.
    pub messages: Vec<Message>,
    pub has_more: bool,
}

/// How a page response was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Applied { added: usize },
    /// The conversation was reset after the request was issued.
    Stale,
}

// =============================================================================
// SCROLL THROTTLE
// =============================================================================

/// Leading-edge throttle: the first signal passes, then nothing for `window`.
#[derive(Clone, Debug)]
pub struct ScrollThrottle {
    window: Duration,
    last: Option<Instant>,
}

impl ScrollThrottle {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether a signal at `now` should pass. Records it if so.
    pub fn allow_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Clone, Debug)]
pub struct PaginationController {
    me: UserId,
    throttle: ScrollThrottle,
}

impl PaginationController {
    #[must_use]
    pub fn new(me: UserId, scroll_window: Duration) -> Self {
        Self { me, throttle: ScrollThrottle::new(scroll_window) }
    }

    fn key(&self, peer: &UserId) -> ConversationKey {
        ConversationKey::new(&self.me, peer)
    }

    /// Fresh open: page 1, `has_more_older = true`, regardless of history.
    pub fn reset(&self, store: &mut ConversationStore, peer: &UserId) {
        store.reset(&self.key(peer));
    }

    /// Request the newest page. Used right after [`Self::reset`].
    pub fn load_first(&self, store: &mut ConversationStore, peer: &UserId) -> Option<PageRequest> {
        self.begin(store, peer, |_| FIRST_PAGE)
    }

    /// Request the page after the cursor, unless one is in flight or history is exhausted.
    pub fn load_older(&self, store: &mut ConversationStore, peer: &UserId) -> Option<PageRequest> {
        self.begin(store, peer, |cursor| cursor + 1)
    }

    /// Scroll reached the top of the message list.
    pub fn on_scroll_top(&mut self, store: &mut ConversationStore, peer: &UserId, now: Instant) -> Option<PageRequest> {
        if !self.throttle.allow_at(now) {
            debug!(%peer, "pagination: scroll signal throttled");
            return None;
        }
        self.load_older(store, peer)
    }

    fn begin(
        &self,
        store: &mut ConversationStore,
        peer: &UserId,
        next_page: impl FnOnce(u32) -> u32,
    ) -> Option<PageRequest> {
        let key = self.key(peer);
        let entry = store.entry_mut(&key);
        if entry.is_loading_older {
            debug!(%key, "pagination: load already in flight");
            return None;
        }
        if !entry.has_more_older {
            debug!(%key, "pagination: history exhausted");
            return None;
        }

        let page = entry
            .failed_page
            .take()
            .unwrap_or_else(|| next_page(entry.current_page_cursor));
        entry.is_loading_older = true;
        info!(%key, page, generation = entry.generation, "pagination: requesting page");

        Some(PageRequest { key, peer: peer.clone(), page, generation: entry.generation })
    }

    /// Apply a successful response.
    pub fn complete(&self, store: &mut ConversationStore, request: &PageRequest, page: Page) -> PageOutcome {
        let entry = store.entry_mut(&request.key);
        if entry.generation != request.generation {
            debug!(key = %request.key, page = request.page, "pagination: dropping stale page");
            return PageOutcome::Stale;
        }

        entry.has_more_older = page.has_more;
        entry.current_page_cursor = request.page;
        entry.is_loading_older = false;
        let added = store.prepend_page(&request.key, page.messages);
        PageOutcome::Applied { added }
    }

    /// Apply a failed response. The same page is retried by the next load.
    pub fn fail(&self, store: &mut ConversationStore, request: &PageRequest) -> PageOutcome {
        let entry = store.entry_mut(&request.key);
        if entry.generation != request.generation {
            return PageOutcome::Stale;
        }
        entry.is_loading_older = false;
        entry.failed_page = Some(request.page);
        PageOutcome::Applied { added: 0 }
    }
}

#[cfg(test)]
#[path = "pagination_test.rs"]
mod tests;
