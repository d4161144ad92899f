// Console input handling.
//
// Translates one line typed on stdin into either a `UserIntent` for the
// engine, or a request the console answers locally (listing actions, help).

use blitz_core::dispatch::{PlaybackCommand, QuickAction};
use blitz_core::protocol::UserIntent;

pub const HELP_TEXT: &str = "\
commands:
  connect <host>    connect to the remote host (port 8765)
  disconnect        close the connection
  prev|toggle|next  playback controls
  send <command>    send any command by name
  <command>         same as `send <command>`
  actions           list the quick actions
  <n>               run quick action number n
  help              show this text
  quit              exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Forward to the engine.
    Intent(UserIntent),
    ListActions,
    Help,
    /// Blank line.
    Nothing,
    /// Not understood; carries the message to print.
    Invalid(String),
}

/// Parse one line of console input.
///
/// A single word that is not a keyword is taken as a command name, so any
/// command the host understands can be sent without `send`.
pub fn parse_line(line: &str, actions: &[QuickAction]) -> Input {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word, rest) {
        ("", _) => Input::Nothing,
        ("quit" | "exit", "") => Input::Intent(UserIntent::Quit),
        ("help" | "?", "") => Input::Help,
        ("actions", "") => Input::ListActions,
        ("disconnect", "") => Input::Intent(UserIntent::Disconnect),
        // An empty host is left for the engine to reject with its own message.
        ("connect", host) => Input::Intent(UserIntent::Connect(host.to_string())),
        ("send", command) => Input::Intent(UserIntent::SendCommand(command.to_string())),
        ("prev", "") => playback(PlaybackCommand::Previous),
        ("toggle" | "play" | "pause", "") => playback(PlaybackCommand::Toggle),
        ("next", "") => playback(PlaybackCommand::Next),
        (word, "") => match word.parse::<usize>() {
            Ok(n) => quick_action(n, actions),
            Err(_) => Input::Intent(UserIntent::SendCommand(word.to_string())),
        },
        (word, _) => Input::Invalid(format!(
            "unexpected arguments after `{word}` (type `help` for commands)"
        )),
    }
}

fn playback(command: PlaybackCommand) -> Input {
    Input::Intent(UserIntent::SendCommand(command.as_str().to_string()))
}

/// Quick actions are numbered from 1 in the order `actions` lists them.
fn quick_action(n: usize, actions: &[QuickAction]) -> Input {
    match n.checked_sub(1).and_then(|i| actions.get(i)) {
        Some(action) => Input::Intent(UserIntent::SendCommand(action.command.clone())),
        None => Input::Invalid(format!(
            "no quick action {n} (there are {})",
            actions.len()
        )),
    }
}

/// Numbered list of quick actions, one per line.
pub fn format_actions(actions: &[QuickAction]) -> Vec<String> {
    if actions.is_empty() {
        return vec!["no quick actions configured".to_string()];
    }
    actions
        .iter()
        .enumerate()
        .map(|(i, action)| format!("{:>2}. {} ({})", i + 1, action.label, action.command))
        .collect()
}
