//! Client configuration parsed from environment variables.
//!
//! Every knob has a typed default, so an empty environment yields a working
//! configuration pointed at a local server. The binary layers `clap` flags on
//! top of this.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_WS_PATH: &str = "/ws";
pub const DEFAULT_ROSTER_PATH: &str = "/api/chat/users";
pub const DEFAULT_HISTORY_PATH: &str = "/api/chat/messages";

/// Constant delay between a socket close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
/// Inactivity window after the last keystroke before `typing:false` is sent.
pub const DEFAULT_TYPING_IDLE_MS: u64 = 2000;
/// Scroll-to-top signals inside this window collapse into one load.
pub const DEFAULT_SCROLL_THROTTLE_MS: u64 = 200;
/// Upper bound on a single roster or history request.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
/// Upper bound on the WebSocket upgrade before the attempt counts as failed.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP origin of the service, e.g. `https://chat.example.com`.
    pub base_url: String,
    pub ws_path: String,
    pub roster_path: String,
    pub history_path: String,
    pub reconnect_delay: Duration,
    pub typing_idle: Duration,
    pub scroll_throttle: Duration,
    pub fetch_timeout: Duration,
    pub handshake_timeout: Duration,
    /// Whether the user granted notification permission.
    pub notifications: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ClientConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `PARLEY_BASE_URL`: default `http://127.0.0.1:8080`
    /// - `PARLEY_WS_PATH`, `PARLEY_ROSTER_PATH`, `PARLEY_HISTORY_PATH`
    /// - `PARLEY_RECONNECT_DELAY_MS`: default 3000
    /// - `PARLEY_TYPING_IDLE_MS`: default 2000
    /// - `PARLEY_SCROLL_THROTTLE_MS`: default 200
    /// - `PARLEY_FETCH_TIMEOUT_SECS`: default 15
    /// - `PARLEY_HANDSHAKE_TIMEOUT_SECS`: default 10
    /// - `PARLEY_NOTIFICATIONS`: `true`/`false`, default `false`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let parse = |key: &str, default: u64| parse_or(lookup(key).as_deref(), default);

        Self {
            base_url: string("PARLEY_BASE_URL", DEFAULT_BASE_URL).trim_end_matches('/').to_owned(),
            ws_path: string("PARLEY_WS_PATH", DEFAULT_WS_PATH),
            roster_path: string("PARLEY_ROSTER_PATH", DEFAULT_ROSTER_PATH),
            history_path: string("PARLEY_HISTORY_PATH", DEFAULT_HISTORY_PATH)
                .trim_end_matches('/')
                .to_owned(),
            reconnect_delay: Duration::from_millis(parse("PARLEY_RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS)),
            typing_idle: Duration::from_millis(parse("PARLEY_TYPING_IDLE_MS", DEFAULT_TYPING_IDLE_MS)),
            scroll_throttle: Duration::from_millis(parse("PARLEY_SCROLL_THROTTLE_MS", DEFAULT_SCROLL_THROTTLE_MS)),
            fetch_timeout: Duration::from_secs(parse("PARLEY_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)),
            handshake_timeout: Duration::from_secs(parse(
                "PARLEY_HANDSHAKE_TIMEOUT_SECS",
                DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            )),
            notifications: parse_or(lookup("PARLEY_NOTIFICATIONS").as_deref(), false),
        }
    }

    /// WebSocket URL derived from `base_url` (`http` → `ws`, `https` → `wss`).
    ///
    /// Returns `None` when `base_url` is not an http(s) origin.
    #[must_use]
    pub fn ws_url(&self) -> Option<String> {
        if let Some(rest) = self.base_url.strip_prefix("http://") {
            return Some(format!("ws://{rest}{}", self.ws_path));
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            return Some(format!("wss://{rest}{}", self.ws_path));
        }
        None
    }
}

fn parse_or<T>(raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
