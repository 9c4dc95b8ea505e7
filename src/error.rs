//! Error taxonomy for the client.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here is fatal once the client is running. Transport failures feed
//! the reconnect loop, protocol failures (`frames::CodecError`) are logged and
//! the frame is dropped, fetch failures become an inert error render for the
//! affected region. Only [`ClientError`] escapes to the caller, at startup.

/// Socket-level failure. Always recovered by reconnecting.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket connect failed: {0}")]
    Connect(#[source] Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket receive failed: {0}")]
    Receive(#[source] Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket send failed: {0}")]
    Send(#[source] Box<tokio_tungstenite::tungstenite::Error>),
    #[error("invalid handshake header: {0}")]
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),
}

/// Roster or history page request failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status} for {path}")]
    Status { status: u16, path: String },
    #[error("timed out after {secs}s waiting for {path}")]
    Timeout { secs: u64, path: String },
}

impl FetchError {
    /// Whether a later identical request could succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Startup failure returned to whoever constructs the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("client requires an authenticated session")]
    NotAuthenticated,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http client setup failed: {0}")]
    HttpSetup(#[from] reqwest::Error),
    #[error("invalid session header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
