//! Connection manager — the single live socket and its reconnect loop.
//!
//! DESIGN
//! ======
//! One spawned task owns the WebSocket. It cycles through
//! `Connecting → Open → ClosedPendingRetry → Connecting` forever, sleeping a
//! fixed delay between a close and the next attempt. There is no retry cap
//! and no backoff growth. Every transition is published on a `watch` channel.
//! A handshake that does not complete within the handshake timeout counts as
//! a failed attempt.
//!
//! Outbound events travel over an unbounded channel into the socket task.
//! [`ConnectionHandle::send`] refuses while the state is not `Open`, and any
//! events still queued when a socket closes are discarded, so nothing sent
//! while disconnected is ever replayed.
//!
//! Inbound text frames are decoded with `frames::decode_event` and forwarded
//! to the runtime. Unknown event types and binary frames are ignored.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures never escape the loop; they end the current socket and
//! schedule the retry. Malformed frames are logged and dropped without
//! touching the socket.

use std::time::Duration;

use frames::{InboundEvent, OutboundEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, HeaderValue};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_HANDSHAKE_TIMEOUT_SECS;
use crate::error::TransportError;
use crate::model::ConnectionState;

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable sender side of the connection, held by the runtime.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl ConnectionHandle {
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Queue `event` for the live socket.
    ///
    /// Returns `false`, and drops the event, unless the socket is open.
    pub fn send(&self, event: OutboundEvent) -> bool {
        let state = self.state();
        if state != ConnectionState::Open {
            warn!(kind = event.kind(), %state, "connection: dropping send while not open");
            return false;
        }
        if self.outbound.send(event).is_err() {
            warn!("connection: socket task gone, dropping send");
            return false;
        }
        true
    }
}

// =============================================================================
// MANAGER
// =============================================================================

struct LoopContext {
    url: String,
    cookie: Option<String>,
    reconnect_delay: Duration,
    handshake_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    inbound: mpsc::UnboundedSender<InboundEvent>,
}

enum SocketEnd {
    Closed,
    Shutdown,
}

/// Owns the socket task. At most one loop runs per manager.
pub struct ConnectionManager {
    url: String,
    cookie: Option<String>,
    reconnect_delay: Duration,
    handshake_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<OutboundEvent>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundEvent>>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// `url` is the full `ws://` or `wss://` endpoint; `cookie` is sent on
    /// every handshake.
    #[must_use]
    pub fn new(url: impl Into<String>, cookie: Option<String>, reconnect_delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            url: url.into(),
            cookie,
            reconnect_delay,
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            state_tx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            shutdown_tx,
            task: None,
        }
    }

    #[must_use]
    pub fn with_handshake_timeout(mut self, limit: Duration) -> Self {
        self.handshake_timeout = limit;
        self
    }

    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle { state: self.state_tx.subscribe(), outbound: self.outbound_tx.clone() }
    }

    /// Observe every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Start the socket loop, delivering decoded events to `inbound`.
    ///
    /// Returns `false` without side effects if the loop was already started.
    pub fn connect(&mut self, inbound: mpsc::UnboundedSender<InboundEvent>) -> bool {
        let Some(outbound_rx) = self.outbound_rx.take() else {
            debug!("connection: connect ignored, loop already started");
            return false;
        };

        let ctx = LoopContext {
            url: self.url.clone(),
            cookie: self.cookie.clone(),
            reconnect_delay: self.reconnect_delay,
            handshake_timeout: self.handshake_timeout,
            state: self.state_tx.clone(),
            inbound,
        };
        let shutdown = self.shutdown_tx.subscribe();
        self.task = Some(tokio::spawn(run(ctx, outbound_rx, shutdown)));
        true
    }

    /// Stop the loop, closing the socket if one is open.
    pub async fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "connection: socket task ended abnormally");
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// SOCKET LOOP
// =============================================================================

async fn run(
    ctx: LoopContext,
    mut outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        ctx.state.send_replace(ConnectionState::Connecting);
        debug!(url = %ctx.url, attempt, "connection: connecting");

        match run_socket(&ctx, &mut outbound, &mut shutdown).await {
            Ok(SocketEnd::Shutdown) => {
                info!("connection: shut down");
                return;
            }
            Ok(SocketEnd::Closed) => info!("connection: closed by server"),
            Err(e) => warn!(error = %e, attempt, "connection: socket failed"),
        }

        ctx.state.send_replace(ConnectionState::ClosedPendingRetry);
        let mut dropped = 0_usize;
        while outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "connection: discarded unsent events");
        }

        info!(delay = ?ctx.reconnect_delay, "connection: retry scheduled");
        tokio::select! {
            () = tokio::time::sleep(ctx.reconnect_delay) => {}
            _ = shutdown.changed() => {
                info!("connection: shut down while waiting to retry");
                return;
            }
        }
    }
}

async fn run_socket(
    ctx: &LoopContext,
    outbound: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SocketEnd, TransportError> {
    let mut request = ctx
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Connect(Box::new(e)))?;
    if let Some(cookie) = &ctx.cookie {
        request.headers_mut().insert(COOKIE, HeaderValue::from_str(cookie)?);
    }

    let handshake = tokio::time::timeout(ctx.handshake_timeout, connect_async(request));
    let (stream, _) = tokio::select! {
        result = handshake => match result {
            Ok(connected) => connected.map_err(|e| TransportError::Connect(Box::new(e)))?,
            Err(_) => {
                let timed_out = std::io::Error::new(std::io::ErrorKind::TimedOut, "websocket handshake timed out");
                return Err(TransportError::Connect(Box::new(tokio_tungstenite::tungstenite::Error::Io(timed_out))));
            }
        },
        _ = shutdown.changed() => return Ok(SocketEnd::Shutdown),
    };

    ctx.state.send_replace(ConnectionState::Open);
    info!(url = %ctx.url, "connection: open");
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => dispatch(ctx, text.as_str()),
                Some(Ok(WsMessage::Close(_))) | None => return Ok(SocketEnd::Closed),
                // Binary, ping and pong frames carry nothing for us.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Receive(Box::new(e))),
            },
            event = outbound.recv() => {
                let Some(event) = event else {
                    return Ok(SocketEnd::Shutdown);
                };
                debug!(kind = event.kind(), "connection: send");
                write
                    .send(WsMessage::Text(frames::encode_event(&event).into()))
                    .await
                    .map_err(|e| TransportError::Send(Box::new(e)))?;
            }
            _ = shutdown.changed() => {
                if let Err(e) = write.send(WsMessage::Close(None)).await {
                    debug!(error = %e, "connection: close frame not sent");
                }
                return Ok(SocketEnd::Shutdown);
            }
        }
    }
}

fn dispatch(ctx: &LoopContext, text: &str) {
    match frames::decode_event(text) {
        Ok(InboundEvent::Unknown(kind)) => debug!(%kind, "connection: ignoring unknown event"),
        Ok(event) => {
            if ctx.inbound.send(event).is_err() {
                debug!("connection: runtime gone, dropping inbound event");
            }
        }
        Err(e) => warn!(error = %e, "connection: dropping malformed frame"),
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
