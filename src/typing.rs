//! Typing signaler — debounced outbound typing and the inbound indicator.
//!
//! DESIGN
//! ======
//! Outbound signaling is edge triggered. The first keystroke sends
//! `typing{is_typing:true}` and arms an idle deadline; later keystrokes only
//! push the deadline. Expiry, blur, sending a message or switching the
//! conversation emit the single falling edge `typing{is_typing:false}`.
//!
//! The signaler owns no timer. The runtime asks for [`TypingSignaler::deadline`]
//! and calls [`TypingSignaler::expire_at`] when it passes, which keeps every
//! transition testable with synthetic instants.
//!
//! Inbound, at most one indicator exists: the open conversation's peer.

use std::time::{Duration, Instant};

use frames::{OutboundEvent, TypingPayload};
use tracing::debug;

use crate::model::UserId;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Signaling {
    peer: UserId,
    deadline: Instant,
}

/// The peer currently shown as typing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypingIndicator {
    pub user_id: UserId,
    pub username: Option<String>,
}

/// What an inbound typing event did to the indicator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndicatorChange {
    Shown(TypingIndicator),
    Hidden,
    Unchanged,
}

#[derive(Debug)]
pub struct TypingSignaler {
    idle: Duration,
    outbound: Option<Signaling>,
    indicator: Option<TypingIndicator>,
}

impl TypingSignaler {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self { idle, outbound: None, indicator: None }
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Local input activity for `peer`. Returns the events to send, in order.
    ///
    /// Empty unless this is a rising edge. Input for a different peer than
    /// the one being signaled stops the old peer first.
    pub fn input_at(&mut self, peer: &UserId, now: Instant) -> Vec<OutboundEvent> {
        let deadline = now + self.idle;
        if let Some(active) = self.outbound.as_mut() {
            if &active.peer == peer {
                active.deadline = deadline;
                return Vec::new();
            }
        }

        let mut events: Vec<OutboundEvent> = self.stop().into_iter().collect();
        debug!(%peer, "typing: start");
        self.outbound = Some(Signaling { peer: peer.clone(), deadline });
        events.push(OutboundEvent::Typing { receiver_id: peer.clone(), is_typing: true });
        events
    }

    /// When the idle deadline falls, if signaling.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.outbound.as_ref().map(|s| s.deadline)
    }

    #[must_use]
    pub fn is_signaling(&self) -> bool {
        self.outbound.is_some()
    }

    /// Emit the falling edge if the idle deadline has passed.
    pub fn expire_at(&mut self, now: Instant) -> Option<OutboundEvent> {
        match &self.outbound {
            Some(active) if active.deadline <= now => self.stop(),
            _ => None,
        }
    }

    /// Emit the falling edge now (blur, send, conversation switch).
    pub fn stop(&mut self) -> Option<OutboundEvent> {
        let active = self.outbound.take()?;
        debug!(peer = %active.peer, "typing: stop");
        Some(OutboundEvent::Typing { receiver_id: active.peer, is_typing: false })
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    #[must_use]
    pub fn indicator(&self) -> Option<&TypingIndicator> {
        self.indicator.as_ref()
    }

    /// Apply a remote typing event. Events not from `open_peer` are dropped.
    pub fn on_remote(&mut self, event: &TypingPayload, open_peer: Option<&UserId>) -> IndicatorChange {
        if open_peer != Some(&event.user_id) {
            debug!(user_id = %event.user_id, "typing: ignoring event for closed conversation");
            return IndicatorChange::Unchanged;
        }

        if event.is_typing {
            if self.indicator.is_some() {
                return IndicatorChange::Unchanged;
            }
            let indicator = TypingIndicator { user_id: event.user_id.clone(), username: event.username.clone() };
            self.indicator = Some(indicator.clone());
            IndicatorChange::Shown(indicator)
        } else {
            self.clear_indicator()
        }
    }

    /// Remove the indicator, e.g. when the open conversation changes.
    pub fn clear_indicator(&mut self) -> IndicatorChange {
        match self.indicator.take() {
            Some(_) => IndicatorChange::Hidden,
            None => IndicatorChange::Unchanged,
        }
    }
}

#[cfg(test)]
#[path = "typing_test.rs"]
mod tests;
