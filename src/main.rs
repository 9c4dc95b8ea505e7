use std::sync::Arc;

use clap::Parser;
use parley::api::HttpMessageSource;
use parley::client::{ChatClient, Command};
use parley::config::ClientConfig;
use parley::error::ClientError;
use parley::model::{Message, RosterEntry, UserId};
use parley::notify::{Notification, Notifier};
use parley::presenter::RenderSignal;
use parley::session::Session;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "parley", about = "Terminal client for the chat service")]
struct Cli {
    /// HTTP origin of the service. Overrides `PARLEY_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Id of the logged-in user.
    #[arg(long, env = "PARLEY_USER_ID")]
    user_id: String,

    #[arg(long, env = "PARLEY_SESSION_TOKEN")]
    session_token: Option<String>,

    /// Show notifications for messages in background conversations.
    #[arg(long)]
    notify: bool,
}

/// Prints notifications inline with the conversation.
struct PrintNotifier;

impl Notifier for PrintNotifier {
    fn notify(&self, notification: &Notification) {
        println!("** {}: {}", notification.title(), notification.preview);
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }
    config.notifications |= cli.notify;

    let session = Session::authenticated(UserId::from(cli.user_id), cli.session_token);
    let source = Arc::new(HttpMessageSource::new(&config, &session)?);
    let (client, mut renders) = ChatClient::start(&config, &session, source, Arc::new(PrintNotifier))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Some(Input::Quit) => break,
                    Some(Input::Command(command)) => {
                        client.command(command);
                    }
                    None => eprintln!("commands: /open <id>, /older, /scroll, /close, /roster, /typing, /idle, /quit"),
                }
            }
            Some(signal) = renders.recv() => print_signal(&session.current_user_id, &signal),
        }
    }

    client.shutdown().await;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Quit,
}

fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Input::Command(Command::Send(line.to_owned())));
    };
    let (name, arg) = rest.split_once(' ').map_or((rest, ""), |(n, a)| (n, a.trim()));
    let command = match name {
        "open" if !arg.is_empty() => Command::Open(UserId::from(arg)),
        "older" => Command::LoadOlder,
        "scroll" => Command::ScrollTop,
        "close" => Command::Close,
        "roster" => Command::RefreshRoster,
        "typing" => Command::Input,
        "idle" => Command::Blur,
        "quit" => return Some(Input::Quit),
        _ => return None,
    };
    Some(Input::Command(command))
}

fn print_signal(me: &UserId, signal: &RenderSignal) {
    match signal {
        RenderSignal::Roster(entries) => {
            println!("-- roster --");
            for entry in entries {
                println!("{}", roster_line(entry));
            }
        }
        RenderSignal::RosterUnavailable { retryable } => {
            println!("!! roster unavailable{}", if *retryable { " (try /roster)" } else { "" });
        }
        RenderSignal::Conversation { peer, messages } => {
            println!("-- conversation with {peer} --");
            for message in messages {
                println!("{}", message_line(me, message));
            }
        }
        RenderSignal::MessageAppended { message, .. } => println!("{}", message_line(me, message)),
        RenderSignal::Typing { indicator: Some(indicator), peer } => {
            println!("   {} is typing...", indicator.username.as_deref().unwrap_or(peer.as_str()));
        }
        RenderSignal::Typing { indicator: None, .. } | RenderSignal::ComposeCleared => {}
        RenderSignal::LoadingOlder { loading: true, .. } => println!("   loading..."),
        RenderSignal::LoadingOlder { loading: false, .. } => {}
        RenderSignal::HistoryUnavailable { retryable, .. } => {
            println!("!! history unavailable{}", if *retryable { " (try /older)" } else { "" });
        }
        RenderSignal::Connection(state) => println!("-- connection {state} --"),
        RenderSignal::Closed => println!("-- conversation closed --"),
    }
}

fn roster_line(entry: &RosterEntry) -> String {
    let presence = if entry.online { '*' } else { ' ' };
    let unread = if entry.unread_count > 0 { format!(" [{}]", entry.unread_count) } else { String::new() };
    let preview = entry.last_message_preview.as_deref().unwrap_or("");
    format!("{presence} {} ({}){unread} {preview}", entry.display_name, entry.user_id)
}

fn message_line(me: &UserId, message: &Message) -> String {
    let who = if &message.sender_id == me {
        "me"
    } else {
        message.sender_name.as_deref().unwrap_or(message.sender_id.as_str())
    };
    format!("[{}] {who}: {}", message.created_at.time(), message.body)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
