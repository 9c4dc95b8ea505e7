use super::*;
use time::macros::datetime;

fn entry(id: &str, name: &str) -> RosterEntry {
    RosterEntry::new(UserId::from(id), name)
}

fn order(roster: &Roster) -> Vec<String> {
    roster.entries().iter().map(|e| e.display_name.clone()).collect()
}

fn seeded() -> Roster {
    let mut roster = Roster::new();
    roster.replace(vec![entry("1", "alice"), entry("42", "bob"), entry("3", "carol")]);
    roster
}

#[test]
fn replace_keeps_server_order() {
    assert_eq!(order(&seeded()), ["alice", "bob", "carol"]);
}

#[test]
fn message_promotes_and_updates_preview() {
    let mut roster = seeded();
    let at = datetime!(2024-01-01 00:00:00 UTC);
    roster.record_message(&UserId::from("3"), None, "a fairly long message body that exceeds the limit", at);

    assert_eq!(order(&roster), ["carol", "alice", "bob"]);
    let carol = roster.get(&UserId::from("3")).expect("carol");
    assert_eq!(carol.last_message_preview.as_deref(), Some("a fairly long message body tha..."));
    assert_eq!(carol.last_message_at, Some(at));
}

#[test]
fn message_from_unknown_peer_adds_entry_at_front() {
    let mut roster = seeded();
    roster.record_message(&UserId::from("99"), Some("dave"), "hey", datetime!(2024-01-01 00:00:00 UTC));
    assert_eq!(order(&roster), ["dave", "alice", "bob", "carol"]);

    roster.record_message(&UserId::from("100"), None, "hey", datetime!(2024-01-01 00:00:00 UTC));
    assert_eq!(roster.entries()[0].display_name, "100");
}

#[test]
fn unread_increments_by_one_and_clears() {
    let mut roster = seeded();
    let bob = UserId::from("42");
    assert_eq!(roster.increment_unread(&bob), 1);
    assert_eq!(roster.increment_unread(&bob), 2);
    roster.clear_unread(&bob);
    assert_eq!(roster.get(&bob).expect("bob").unread_count, 0);
    assert_eq!(roster.increment_unread(&UserId::from("nobody")), 0);
}

#[test]
fn presence_reports_changes_only() {
    let mut roster = seeded();
    let bob = UserId::from("42");
    assert_eq!(roster.set_online(&bob, true), Some(true));
    assert_eq!(roster.set_online(&bob, true), Some(false));
    assert_eq!(roster.set_online(&bob, false), Some(true));
    assert_eq!(roster.set_online(&UserId::from("nobody"), true), None);
}

#[test]
fn concurrent_loads_are_refused() {
    let mut roster = Roster::new();
    assert!(roster.begin_load());
    assert!(!roster.begin_load());
    roster.finish_load();
    assert!(roster.begin_load());
}

#[test]
fn display_name_falls_back_to_id() {
    let roster = seeded();
    assert_eq!(roster.display_name(&UserId::from("42")), "bob");
    assert_eq!(roster.display_name(&UserId::from("77")), "77");
}

#[test]
fn snapshot_keeps_newer_local_activity() {
    let mut roster = seeded();
    let bob = UserId::from("42");
    let at = datetime!(2024-01-01 12:00:00 UTC);
    roster.record_message(&bob, None, "fresh", at);
    roster.increment_unread(&bob);

    // Snapshot taken before the message: bob last, stale preview, nothing unread.
    let mut stale_bob = entry("42", "bob");
    stale_bob.last_message_preview = Some("old".into());
    stale_bob.last_message_at = Some(datetime!(2024-01-01 09:00:00 UTC));
    roster.replace(vec![entry("1", "alice"), entry("3", "carol"), stale_bob]);

    assert_eq!(order(&roster), ["bob", "alice", "carol"]);
    let bob_entry = roster.get(&bob).expect("bob");
    assert_eq!(bob_entry.unread_count, 1);
    assert_eq!(bob_entry.last_message_preview.as_deref(), Some("fresh"));
    assert_eq!(bob_entry.last_message_at, Some(at));
}

#[test]
fn snapshot_newer_than_local_activity_wins() {
    let mut roster = seeded();
    let bob = UserId::from("42");
    roster.record_message(&bob, None, "older", datetime!(2024-01-01 09:00:00 UTC));
    roster.increment_unread(&bob);

    let mut server_bob = entry("42", "bob");
    server_bob.last_message_preview = Some("newer".into());
    server_bob.last_message_at = Some(datetime!(2024-01-01 12:00:00 UTC));
    server_bob.unread_count = 4;
    roster.replace(vec![server_bob, entry("1", "alice")]);

    let bob_entry = roster.get(&bob).expect("bob");
    assert_eq!(bob_entry.unread_count, 4);
    assert_eq!(bob_entry.last_message_preview.as_deref(), Some("newer"));

    // Local activity is replayed onto one snapshot only.
    roster.replace(vec![entry("1", "alice"), entry("42", "bob")]);
    assert_eq!(roster.get(&bob).expect("bob").unread_count, 0);
}

#[test]
fn snapshot_missing_a_locally_added_peer_keeps_it() {
    let mut roster = seeded();
    roster.record_message(&UserId::from("99"), Some("dave"), "hey", datetime!(2024-01-01 00:00:00 UTC));
    roster.replace(vec![entry("1", "alice")]);
    assert_eq!(order(&roster), ["dave", "alice"]);
}
