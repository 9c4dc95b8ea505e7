use super::*;

fn command(line: &str) -> Option<Command> {
    match parse_line(line) {
        Some(Input::Command(command)) => Some(command),
        _ => None,
    }
}

#[test]
fn plain_text_is_sent() {
    assert_eq!(command("  hello there "), Some(Command::Send("hello there".into())));
}

#[test]
fn slash_commands_map_to_actions() {
    assert_eq!(command("/open 42"), Some(Command::Open(UserId::from("42"))));
    assert_eq!(command("/older"), Some(Command::LoadOlder));
    assert_eq!(command("/scroll"), Some(Command::ScrollTop));
    assert_eq!(command("/close"), Some(Command::Close));
    assert_eq!(command("/roster"), Some(Command::RefreshRoster));
    assert_eq!(command("/typing"), Some(Command::Input));
    assert_eq!(command("/idle"), Some(Command::Blur));
    assert_eq!(parse_line("/quit"), Some(Input::Quit));
}

#[test]
fn unknown_or_incomplete_commands_are_rejected() {
    assert_eq!(parse_line("/open"), None);
    assert_eq!(parse_line("/dance"), None);
}
