//! Conversation presenter — reconciles every input into render signals.
//!
//! DESIGN
//! ======
//! The presenter owns the store, the pagination controller, the roster and
//! the typing signaler, and is the only code that mutates them. It is fully
//! synchronous: each entry point takes one input (a user action, an inbound
//! event, a connection transition or a fetch completion) and returns the
//! [`Effect`]s the runtime must carry out, in order. Nothing here touches the
//! network or a clock, so every behavior is testable with plain values.
//!
//! Sending never appends locally. A message becomes visible only when the
//! server echoes it back as `new_message`, which the store de-duplicates.
//!
//! Page completions are checked twice: the pagination controller drops
//! responses from before a re-open (generation), and the presenter only
//! renders pages for the conversation that is open right now.

use std::time::Instant;

use frames::{InboundEvent, OutboundEvent, StatusPayload};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::model::{ConnectionState, ConversationKey, Message, RosterEntry, UserId};
use crate::notify::Notification;
use crate::pagination::{Page, PageOutcome, PageRequest, PaginationController};
use crate::roster::Roster;
use crate::session::Session;
use crate::store::ConversationStore;
use crate::typing::{IndicatorChange, TypingIndicator, TypingSignaler};

// =============================================================================
// OUTPUTS
// =============================================================================

/// Something the view should redraw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderSignal {
    Roster(Vec<RosterEntry>),
    RosterUnavailable { retryable: bool },
    /// Full message list for the open conversation, oldest first.
    Conversation { peer: UserId, messages: Vec<Message> },
    MessageAppended { peer: UserId, message: Message },
    /// `None` hides the indicator.
    Typing { peer: UserId, indicator: Option<TypingIndicator> },
    LoadingOlder { peer: UserId, loading: bool },
    HistoryUnavailable { peer: UserId, retryable: bool },
    ComposeCleared,
    Connection(ConnectionState),
    /// No conversation is open any more.
    Closed,
}

/// Work requested by the presenter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Send(OutboundEvent),
    FetchPage(PageRequest),
    FetchRoster,
    Notify(Notification),
    Render(RenderSignal),
}

// =============================================================================
// PRESENTER
// =============================================================================

#[derive(Debug)]
pub struct Presenter {
    me: UserId,
    store: ConversationStore,
    pagination: PaginationController,
    roster: Roster,
    typing: TypingSignaler,
    open: Option<UserId>,
    connection: ConnectionState,
}

impl Presenter {
    #[must_use]
    pub fn new(session: &Session, config: &ClientConfig) -> Self {
        let me = session.current_user_id.clone();
        Self {
            pagination: PaginationController::new(me.clone(), config.scroll_throttle),
            me,
            store: ConversationStore::new(),
            roster: Roster::new(),
            typing: TypingSignaler::new(config.typing_idle),
            open: None,
            connection: ConnectionState::Connecting,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn open_peer(&self) -> Option<&UserId> {
        self.open.as_ref()
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[must_use]
    pub fn messages_with(&self, peer: &UserId) -> Vec<Message> {
        self.store.messages(&ConversationKey::new(&self.me, peer))
    }

    /// When the outbound typing signal should fall, if it is up.
    #[must_use]
    pub fn typing_deadline(&self) -> Option<Instant> {
        self.typing.deadline()
    }

    fn roster_render(&self) -> Effect {
        Effect::Render(RenderSignal::Roster(self.roster.entries().to_vec()))
    }

    fn stop_typing(&mut self, effects: &mut Vec<Effect>) {
        if let Some(event) = self.typing.stop() {
            effects.push(Effect::Send(event));
        }
    }

    fn hide_indicator(&mut self, peer: &UserId, effects: &mut Vec<Effect>) {
        if self.typing.clear_indicator() == IndicatorChange::Hidden {
            effects.push(Effect::Render(RenderSignal::Typing { peer: peer.clone(), indicator: None }));
        }
    }

    // =========================================================================
    // USER ACTIONS
    // =========================================================================

    /// Open the conversation with `peer`, always starting from page 1.
    pub fn open(&mut self, peer: UserId) -> Vec<Effect> {
        if peer == self.me {
            warn!(%peer, "presenter: refusing to open a conversation with self");
            return Vec::new();
        }

        let mut effects = Vec::new();
        self.stop_typing(&mut effects);
        if let Some(previous) = self.open.take() {
            self.hide_indicator(&previous, &mut effects);
        }

        info!(%peer, "presenter: open conversation");
        self.open = Some(peer.clone());
        self.roster.clear_unread(&peer);
        self.roster.promote(&peer);
        effects.push(self.roster_render());

        self.pagination.reset(&mut self.store, &peer);
        effects.push(Effect::Render(RenderSignal::Conversation { peer: peer.clone(), messages: Vec::new() }));
        if let Some(request) = self.pagination.load_first(&mut self.store, &peer) {
            effects.push(Effect::Render(RenderSignal::LoadingOlder { peer, loading: true }));
            effects.push(Effect::FetchPage(request));
        }
        effects
    }

    /// Close the open conversation. Later events for it are merged silently.
    pub fn close(&mut self) -> Vec<Effect> {
        let Some(peer) = self.open.take() else {
            return Vec::new();
        };
        info!(%peer, "presenter: close conversation");
        let mut effects = Vec::new();
        self.stop_typing(&mut effects);
        self.hide_indicator(&peer, &mut effects);
        effects.push(Effect::Render(RenderSignal::Closed));
        effects
    }

    /// Send `body` to the open conversation.
    pub fn send(&mut self, body: &str) -> Vec<Effect> {
        let body = body.trim();
        if body.is_empty() {
            return Vec::new();
        }
        let Some(peer) = self.open.clone() else {
            warn!("presenter: send with no open conversation");
            return Vec::new();
        };
        if self.connection != ConnectionState::Open {
            warn!(%peer, state = %self.connection, "presenter: send while disconnected, keeping compose");
            return Vec::new();
        }

        let mut effects = vec![
            Effect::Send(OutboundEvent::ChatMessage { receiver_id: peer, message: body.to_owned() }),
            Effect::Render(RenderSignal::ComposeCleared),
        ];
        self.stop_typing(&mut effects);
        effects
    }

    /// Keystroke in the compose box.
    ///
    /// Nothing is armed while disconnected, so the first keystroke after a
    /// reconnect still raises the signal.
    pub fn input(&mut self, now: Instant) -> Vec<Effect> {
        let Some(peer) = self.open.clone() else {
            return Vec::new();
        };
        if self.connection != ConnectionState::Open {
            return Vec::new();
        }
        self.typing.input_at(&peer, now).into_iter().map(Effect::Send).collect()
    }

    /// Compose box lost focus.
    pub fn blur(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.stop_typing(&mut effects);
        effects
    }

    /// The typing deadline may have passed.
    pub fn typing_expired(&mut self, now: Instant) -> Vec<Effect> {
        self.typing.expire_at(now).map(Effect::Send).into_iter().collect()
    }

    /// Message list scrolled to the top.
    pub fn scroll_top(&mut self, now: Instant) -> Vec<Effect> {
        let Some(peer) = self.open.clone() else {
            return Vec::new();
        };
        let request = self.pagination.on_scroll_top(&mut self.store, &peer, now);
        Self::page_effects(peer, request)
    }

    /// Explicit "load older" (also the retry after a failed page).
    pub fn load_older(&mut self) -> Vec<Effect> {
        let Some(peer) = self.open.clone() else {
            return Vec::new();
        };
        let request = self.pagination.load_older(&mut self.store, &peer);
        Self::page_effects(peer, request)
    }

    fn page_effects(peer: UserId, request: Option<PageRequest>) -> Vec<Effect> {
        match request {
            Some(request) => vec![
                Effect::Render(RenderSignal::LoadingOlder { peer, loading: true }),
                Effect::FetchPage(request),
            ],
            None => Vec::new(),
        }
    }

    /// Ask for a fresh roster unless one is already loading.
    pub fn refresh_roster(&mut self) -> Vec<Effect> {
        if self.roster.begin_load() {
            vec![Effect::FetchRoster]
        } else {
            debug!("presenter: roster load already running");
            Vec::new()
        }
    }

    // =========================================================================
    // INBOUND EVENTS
    // =========================================================================

    pub fn inbound(&mut self, event: InboundEvent) -> Vec<Effect> {
        match event {
            InboundEvent::NewMessage(payload) => self.on_message(Message::from(payload)),
            InboundEvent::Typing(payload) => {
                let peer = payload.user_id.clone();
                match self.typing.on_remote(&payload, self.open.as_ref()) {
                    IndicatorChange::Shown(indicator) => {
                        vec![Effect::Render(RenderSignal::Typing { peer, indicator: Some(indicator) })]
                    }
                    IndicatorChange::Hidden => vec![Effect::Render(RenderSignal::Typing { peer, indicator: None })],
                    IndicatorChange::Unchanged => Vec::new(),
                }
            }
            InboundEvent::UserStatus(payload) => self.on_status(&payload),
            InboundEvent::ForceRefresh => {
                info!("presenter: server requested roster refresh");
                self.refresh_roster()
            }
            InboundEvent::Unknown(kind) => {
                debug!(%kind, "presenter: ignoring unknown event");
                Vec::new()
            }
        }
    }

    fn on_message(&mut self, message: Message) -> Vec<Effect> {
        let Some(peer) = message.peer_of(&self.me).cloned() else {
            warn!(sender = %message.sender_id, receiver = %message.receiver_id, "presenter: message not addressed to us");
            return Vec::new();
        };
        if !self.store.append(&message.key(), message.clone()) {
            debug!(%peer, "presenter: duplicate message");
            return Vec::new();
        }

        let from_peer = message.sender_id == peer;
        let name = if from_peer { message.sender_name.as_deref() } else { None };
        self.roster.record_message(&peer, name, &message.body, message.created_at);

        let mut effects = Vec::new();
        if self.open.as_ref() == Some(&peer) {
            effects.push(Effect::Render(RenderSignal::MessageAppended { peer, message }));
        } else if from_peer {
            let unread = self.roster.increment_unread(&peer);
            debug!(%peer, unread, "presenter: unread message");
            let roster_name = self.roster.get(&peer).map(|e| e.display_name.as_str());
            effects.push(Effect::Notify(Notification::for_message(&message, roster_name)));
        }
        effects.push(self.roster_render());
        effects
    }

    fn on_status(&mut self, payload: &StatusPayload) -> Vec<Effect> {
        match self.roster.set_online(&payload.user_id, payload.is_online) {
            Some(true) => {
                debug!(user_id = %payload.user_id, online = payload.is_online, "presenter: presence changed");
                vec![self.roster_render()]
            }
            Some(false) => Vec::new(),
            None => {
                debug!(user_id = %payload.user_id, "presenter: presence for unlisted user, reloading roster");
                self.refresh_roster()
            }
        }
    }

    // =========================================================================
    // CONNECTION
    // =========================================================================

    pub fn connection_changed(&mut self, state: ConnectionState) -> Vec<Effect> {
        if state == self.connection {
            return Vec::new();
        }
        let was_open = self.connection == ConnectionState::Open;
        self.connection = state;

        let mut effects = vec![Effect::Render(RenderSignal::Connection(state))];
        if state == ConnectionState::Open {
            effects.extend(self.refresh_roster());
        } else if was_open {
            // The socket is gone: our stop cannot be delivered and the peer's will never arrive.
            if self.typing.stop().is_some() {
                debug!("presenter: typing signal abandoned with the socket");
            }
            if let Some(peer) = self.open.clone() {
                self.hide_indicator(&peer, &mut effects);
            }
        }
        effects
    }

    // =========================================================================
    // FETCH COMPLETIONS
    // =========================================================================

    pub fn roster_loaded(&mut self, result: Result<Vec<RosterEntry>, FetchError>) -> Vec<Effect> {
        self.roster.finish_load();
        match result {
            Ok(entries) => {
                info!(count = entries.len(), "presenter: roster loaded");
                self.roster.replace(entries);
                if let Some(peer) = &self.open {
                    self.roster.clear_unread(peer);
                }
                vec![self.roster_render()]
            }
            Err(e) => {
                warn!(error = %e, "presenter: roster load failed");
                vec![Effect::Render(RenderSignal::RosterUnavailable { retryable: e.retryable() })]
            }
        }
    }

    pub fn page_loaded(&mut self, request: &PageRequest, result: Result<Page, FetchError>) -> Vec<Effect> {
        let is_open = self.open.as_ref() == Some(&request.peer);
        match result {
            Ok(page) => {
                let outcome = self.pagination.complete(&mut self.store, request, page);
                if outcome == PageOutcome::Stale || !is_open {
                    return Vec::new();
                }
                vec![
                    Effect::Render(RenderSignal::LoadingOlder { peer: request.peer.clone(), loading: false }),
                    Effect::Render(RenderSignal::Conversation {
                        peer: request.peer.clone(),
                        messages: self.store.messages(&request.key),
                    }),
                ]
            }
            Err(e) => {
                warn!(peer = %request.peer, page = request.page, error = %e, "presenter: history load failed");
                let outcome = self.pagination.fail(&mut self.store, request);
                if outcome == PageOutcome::Stale || !is_open {
                    return Vec::new();
                }
                vec![
                    Effect::Render(RenderSignal::LoadingOlder { peer: request.peer.clone(), loading: false }),
                    Effect::Render(RenderSignal::HistoryUnavailable {
                        peer: request.peer.clone(),
                        retryable: e.retryable(),
                    }),
                ]
            }
        }
    }
}

#[cfg(test)]
#[path = "presenter_test.rs"]
mod tests;
