use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_environment_uses_defaults() {
    let cfg = ClientConfig::from_lookup(|_| None);
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.ws_path, "/ws");
    assert_eq!(cfg.roster_path, "/api/chat/users");
    assert_eq!(cfg.history_path, "/api/chat/messages");
    assert_eq!(cfg.reconnect_delay, Duration::from_secs(3));
    assert_eq!(cfg.typing_idle, Duration::from_secs(2));
    assert_eq!(cfg.scroll_throttle, Duration::from_millis(200));
    assert_eq!(cfg.fetch_timeout, Duration::from_secs(15));
    assert_eq!(cfg.handshake_timeout, Duration::from_secs(10));
    assert!(!cfg.notifications);
    assert_eq!(cfg, ClientConfig::default());
}

#[test]
fn overrides_are_parsed() {
    let cfg = ClientConfig::from_lookup(lookup(&[
        ("PARLEY_BASE_URL", "https://chat.example.com/"),
        ("PARLEY_RECONNECT_DELAY_MS", "250"),
        ("PARLEY_TYPING_IDLE_MS", "500"),
        ("PARLEY_NOTIFICATIONS", "true"),
        ("PARLEY_HISTORY_PATH", "/history/"),
    ]));
    assert_eq!(cfg.base_url, "https://chat.example.com");
    assert_eq!(cfg.reconnect_delay, Duration::from_millis(250));
    assert_eq!(cfg.typing_idle, Duration::from_millis(500));
    assert_eq!(cfg.history_path, "/history");
    assert!(cfg.notifications);
}

#[test]
fn unparseable_numbers_fall_back_to_defaults() {
    let cfg = ClientConfig::from_lookup(lookup(&[
        ("PARLEY_RECONNECT_DELAY_MS", "soon"),
        ("PARLEY_NOTIFICATIONS", "maybe"),
    ]));
    assert_eq!(cfg.reconnect_delay, Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS));
    assert!(!cfg.notifications);
}

#[test]
fn ws_url_follows_scheme() {
    let mut cfg = ClientConfig::default();
    cfg.base_url = "http://localhost:8080".to_owned();
    assert_eq!(cfg.ws_url().as_deref(), Some("ws://localhost:8080/ws"));

    cfg.base_url = "https://chat.example.com".to_owned();
    assert_eq!(cfg.ws_url().as_deref(), Some("wss://chat.example.com/ws"));

    cfg.base_url = "ftp://nope".to_owned();
    assert_eq!(cfg.ws_url(), None);
}
