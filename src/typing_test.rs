use super::*;

const IDLE: Duration = Duration::from_millis(2000);

fn bob() -> UserId {
    UserId::from("42")
}

fn carol() -> UserId {
    UserId::from("3")
}

fn remote(user: &UserId, is_typing: bool) -> TypingPayload {
    TypingPayload { user_id: user.clone(), is_typing, username: Some("bob".into()) }
}

fn typing(peer: &UserId, is_typing: bool) -> OutboundEvent {
    OutboundEvent::Typing { receiver_id: peer.clone(), is_typing }
}

#[test]
fn first_keystroke_sends_start_once() {
    let mut sig = TypingSignaler::new(IDLE);
    let t0 = Instant::now();

    assert_eq!(sig.input_at(&bob(), t0), [typing(&bob(), true)]);
    assert!(sig.input_at(&bob(), t0 + Duration::from_millis(100)).is_empty());
    assert!(sig.input_at(&bob(), t0 + Duration::from_millis(900)).is_empty());
    assert!(sig.is_signaling());
}

#[test]
fn keystrokes_push_the_deadline() {
    let mut sig = TypingSignaler::new(IDLE);
    let t0 = Instant::now();

    sig.input_at(&bob(), t0);
    assert_eq!(sig.deadline(), Some(t0 + IDLE));

    let t1 = t0 + Duration::from_millis(1500);
    sig.input_at(&bob(), t1);
    assert_eq!(sig.deadline(), Some(t1 + IDLE));

    // The first deadline passes without a stop.
    assert!(sig.expire_at(t0 + IDLE).is_none());
    assert_eq!(sig.expire_at(t1 + IDLE), Some(typing(&bob(), false)));
    assert!(!sig.is_signaling());
    assert!(sig.deadline().is_none());
}

#[test]
fn stop_is_sent_only_while_signaling() {
    let mut sig = TypingSignaler::new(IDLE);
    assert!(sig.stop().is_none());

    sig.input_at(&bob(), Instant::now());
    assert_eq!(sig.stop(), Some(typing(&bob(), false)));
    assert!(sig.stop().is_none());
}

#[test]
fn input_for_another_peer_stops_the_previous_one() {
    let mut sig = TypingSignaler::new(IDLE);
    let t0 = Instant::now();

    sig.input_at(&bob(), t0);
    let events = sig.input_at(&carol(), t0 + Duration::from_millis(10));
    assert_eq!(events, [typing(&bob(), false), typing(&carol(), true)]);
}

#[test]
fn remote_typing_for_non_open_peer_is_ignored() {
    let mut sig = TypingSignaler::new(IDLE);
    assert_eq!(sig.on_remote(&remote(&carol(), true), Some(&bob())), IndicatorChange::Unchanged);
    assert_eq!(sig.on_remote(&remote(&carol(), true), None), IndicatorChange::Unchanged);
    assert!(sig.indicator().is_none());
}

#[test]
fn remote_typing_is_idempotent() {
    let mut sig = TypingSignaler::new(IDLE);
    let open = bob();

    let shown = sig.on_remote(&remote(&bob(), true), Some(&open));
    assert!(matches!(shown, IndicatorChange::Shown(ref i) if i.username.as_deref() == Some("bob")));
    assert_eq!(sig.on_remote(&remote(&bob(), true), Some(&open)), IndicatorChange::Unchanged);

    assert_eq!(sig.on_remote(&remote(&bob(), false), Some(&open)), IndicatorChange::Hidden);
    assert_eq!(sig.on_remote(&remote(&bob(), false), Some(&open)), IndicatorChange::Unchanged);
}

#[test]
fn clearing_indicator_reports_whether_one_was_shown() {
    let mut sig = TypingSignaler::new(IDLE);
    assert_eq!(sig.clear_indicator(), IndicatorChange::Unchanged);

    sig.on_remote(&remote(&bob(), true), Some(&bob()));
    assert_eq!(sig.clear_indicator(), IndicatorChange::Hidden);
    assert!(sig.indicator().is_none());
}
