//! Client runtime — one task that drives the presenter.
//!
//! DESIGN
//! ======
//! Every input reaches the presenter through a single `select!` loop, one at
//! a time: user commands, decoded socket events, connection transitions, the
//! typing deadline and fetch completions. The presenter answers with effects
//! and the loop applies them:
//!
//! - `Send` goes to the connection handle (dropped when not open).
//! - `FetchPage` / `FetchRoster` spawn a task that calls the
//!   [`MessageSource`] under a timeout and posts the result back into the loop.
//! - `Notify` passes through the permission gate.
//! - `Render` is forwarded to the view channel.
//!
//! Because fetch results re-enter the loop as ordinary events, presenter
//! state is never touched concurrently and no locking is needed.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::MessageSource;
use crate::config::ClientConfig;
use crate::connection::{ConnectionHandle, ConnectionManager};
use crate::error::{ClientError, FetchError};
use crate::model::{ConnectionState, RosterEntry, UserId};
use crate::notify::{NotificationGate, Notifier};
use crate::pagination::{Page, PageRequest};
use crate::presenter::{Effect, Presenter, RenderSignal};
use crate::session::Session;

/// User actions accepted by the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Open(UserId),
    Close,
    Send(String),
    /// A keystroke in the compose box.
    Input,
    /// The compose box lost focus.
    Blur,
    ScrollTop,
    LoadOlder,
    RefreshRoster,
}

enum Completion {
    Roster(Result<Vec<RosterEntry>, FetchError>),
    Page(PageRequest, Result<Page, FetchError>),
}

// =============================================================================
// PUBLIC HANDLE
// =============================================================================

/// A running client. Dropping it stops the runtime.
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChatClient {
    /// Connect and start the runtime. Render signals arrive on the returned receiver.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotAuthenticated`] for an unauthenticated session
    /// and [`ClientError::InvalidBaseUrl`] if no socket URL can be derived.
    pub fn start(
        config: &ClientConfig,
        session: &Session,
        source: Arc<dyn MessageSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RenderSignal>), ClientError> {
        if !session.is_authenticated {
            return Err(ClientError::NotAuthenticated);
        }
        let ws_url = config.ws_url().ok_or_else(|| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
        info!(user = %session.current_user_id, %ws_url, "client: starting");

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let mut connection = ConnectionManager::new(ws_url, session.cookie(), config.reconnect_delay)
            .with_handshake_timeout(config.handshake_timeout);
        let state_rx = connection.subscribe();
        let handle = connection.handle();
        connection.connect(inbound_tx);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (renders_tx, renders_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let runtime = Runtime {
            presenter: Presenter::new(session, config),
            connection,
            handle,
            source,
            notifications: NotificationGate::new(config.notifications, notifier),
            fetch_timeout: config.fetch_timeout,
            renders: renders_tx,
            completions: completions_tx,
        };
        let inputs = Inputs {
            commands: commands_rx,
            inbound: inbound_rx,
            state: state_rx,
            completions: completions_rx,
            stop: stop_rx,
        };
        let task = tokio::spawn(runtime.run(inputs));

        Ok((Self { commands: commands_tx, stop: stop_tx, task }, renders_rx))
    }

    /// Queue a user action. Returns `false` once the runtime has stopped.
    pub fn command(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Stop the runtime and close the socket.
    pub async fn shutdown(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "client: runtime ended abnormally");
        }
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

struct Inputs {
    commands: mpsc::UnboundedReceiver<Command>,
    inbound: mpsc::UnboundedReceiver<frames::InboundEvent>,
    state: watch::Receiver<ConnectionState>,
    completions: mpsc::UnboundedReceiver<Completion>,
    stop: watch::Receiver<bool>,
}

struct Runtime {
    presenter: Presenter,
    connection: ConnectionManager,
    handle: ConnectionHandle,
    source: Arc<dyn MessageSource>,
    notifications: NotificationGate,
    fetch_timeout: Duration,
    renders: mpsc::UnboundedSender<RenderSignal>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl Runtime {
    async fn run(mut self, mut inputs: Inputs) {
        loop {
            let deadline = self.presenter.typing_deadline();
            let effects = tokio::select! {
                command = inputs.commands.recv() => match command {
                    Some(command) => self.command(command),
                    None => break,
                },
                Some(event) = inputs.inbound.recv() => {
                    debug!(kind = event.kind(), "client: inbound");
                    self.presenter.inbound(event)
                }
                changed = inputs.state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *inputs.state.borrow_and_update();
                    self.presenter.connection_changed(state)
                }
                Some(done) = inputs.completions.recv() => self.complete(done),
                () = typing_timer(deadline) => self.presenter.typing_expired(Instant::now()),
                _ = inputs.stop.changed() => break,
            };
            self.apply(effects);
        }

        info!("client: stopping");
        self.connection.shutdown().await;
    }

    fn command(&mut self, command: Command) -> Vec<Effect> {
        debug!(?command, "client: command");
        match command {
            Command::Open(peer) => self.presenter.open(peer),
            Command::Close => self.presenter.close(),
            Command::Send(body) => self.presenter.send(&body),
            Command::Input => self.presenter.input(Instant::now()),
            Command::Blur => self.presenter.blur(),
            Command::ScrollTop => self.presenter.scroll_top(Instant::now()),
            Command::LoadOlder => self.presenter.load_older(),
            Command::RefreshRoster => self.presenter.refresh_roster(),
        }
    }

    fn complete(&mut self, done: Completion) -> Vec<Effect> {
        match done {
            Completion::Roster(result) => self.presenter.roster_loaded(result),
            Completion::Page(request, result) => self.presenter.page_loaded(&request, result),
        }
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(event) => {
                    self.handle.send(event);
                }
                Effect::FetchPage(request) => self.spawn_page(request),
                Effect::FetchRoster => self.spawn_roster(),
                Effect::Notify(notification) => {
                    self.notifications.deliver(&notification);
                }
                Effect::Render(signal) => {
                    if self.renders.send(signal).is_err() {
                        debug!("client: view gone, dropping render");
                    }
                }
            }
        }
    }

    fn spawn_page(&self, request: PageRequest) {
        let source = Arc::clone(&self.source);
        let completions = self.completions.clone();
        let limit = self.fetch_timeout;
        tokio::spawn(async move {
            let what = format!("history page {} with {}", request.page, request.peer);
            let result = within(limit, what, source.fetch_page(&request.peer, request.page)).await;
            let _ = completions.send(Completion::Page(request, result));
        });
    }

    fn spawn_roster(&self) {
        let source = Arc::clone(&self.source);
        let completions = self.completions.clone();
        let limit = self.fetch_timeout;
        tokio::spawn(async move {
            let result = within(limit, "roster".to_owned(), source.fetch_roster()).await;
            let _ = completions.send(Completion::Roster(result));
        });
    }
}

/// Resolves at `deadline`, or never when there is none.
async fn typing_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn within<T>(
    limit: Duration,
    what: String,
    fetch: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    tokio::time::timeout(limit, fetch)
        .await
        .unwrap_or_else(|_| Err(FetchError::Timeout { secs: limit.as_secs(), path: what }))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
