// Outbound command dispatch and the default command vocabulary.
//
// Commands are fire-and-forget: a command counts as sent once it is queued
// on the live socket. The host never acknowledges it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::connection::ConnectionManager;
use crate::error::EngineError;
use crate::protocol::CommandEnvelope;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Transport controls for the host's active media player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Previous,
    Toggle,
    Next,
}

impl PlaybackCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackCommand::Previous => "player_prev",
            PlaybackCommand::Toggle => "player_toggle",
            PlaybackCommand::Next => "player_next",
        }
    }
}

/// A named system action offered to the user. The host decides what each
/// command does; the client only forwards the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub command: String,
    pub label: String,
}

impl QuickAction {
    pub fn new(command: &str, label: &str) -> Self {
        QuickAction {
            command: command.to_string(),
            label: label.to_string(),
        }
    }
}

pub fn default_quick_actions() -> Vec<QuickAction> {
    vec![
        QuickAction::new("update", "🚀 System Update"),
        QuickAction::new("list_home", "📂 List Home"),
        QuickAction::new("status", "Git Status"),
        QuickAction::new("open_firefox", "🔥 Open Firefox"),
        QuickAction::new("open_vscode", "🖥️ Open VSCode"),
        QuickAction::new("open_edge", "🌐 Open Edge"),
        QuickAction::new("open_postman", "📬 Open Postman"),
    ]
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Serialize `name` as a command frame and queue it on the connection.
///
/// Returns the confirmation text for the output log. Nothing is transmitted
/// unless the connection is `Connected`; that check comes before the name
/// check, so a blank name while disconnected is `NotConnected`.
pub fn send_command(conn: &mut ConnectionManager, name: &str) -> Result<String, EngineError> {
    if !conn.phase().is_connected() {
        warn!("Command '{}' not sent: not connected", name.trim());
        return Err(EngineError::NotConnected);
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::EmptyCommand);
    }

    let frame = CommandEnvelope::new(name).encode();
    if let Err(e) = conn.send(frame) {
        warn!("Command '{}' not sent: {}", name, e);
        return Err(e);
    }

    info!("Sent command: {}", name);
    Ok(format!("Sent command: {name}..."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{FrameSink, FrameStream, Transport};
    use crate::protocol::{EngineEvent, SocketEvent};
    use async_trait::async_trait;
    use futures_util::{stream, StreamExt};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};

    /// Never-ending session that records written frames.
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<Message>>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn open(&self, _url: &str) -> Result<(FrameSink, FrameStream), WsError> {
            let sent = Arc::clone(&self.sent);
            let write = futures_util::sink::unfold((), move |(), msg: Message| {
                let sent = Arc::clone(&sent);
                async move {
                    sent.lock().unwrap().push(msg);
                    Ok::<_, WsError>(())
                }
            });
            Ok((Box::pin(write), stream::pending().boxed()))
        }
    }

    fn recording() -> (
        ConnectionManager,
        mpsc::Receiver<EngineEvent>,
        Arc<Mutex<Vec<Message>>>,
    ) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            sent: Arc::clone(&sent),
        };
        let (tx, rx) = mpsc::channel(16);
        (ConnectionManager::new(Arc::new(transport), tx), rx, sent)
    }

    #[tokio::test]
    async fn refuses_when_not_connected() {
        let (mut conn, _rx, sent) = recording();
        assert_eq!(send_command(&mut conn, "x"), Err(EngineError::NotConnected));

        conn.open("host").unwrap();
        assert_eq!(send_command(&mut conn, "x"), Err(EngineError::NotConnected));

        tokio::task::yield_now().await;
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connected_send_writes_envelope_and_confirms() {
        let (mut conn, mut rx, sent) = recording();
        let session = conn.open("host").unwrap();
        let Some(EngineEvent::Socket { event, .. }) = rx.recv().await else {
            panic!("expected open event");
        };
        assert_eq!(event, SocketEvent::Opened);
        conn.on_socket_event(session, &event);

        let confirmation = send_command(&mut conn, "player_toggle").unwrap();
        assert_eq!(confirmation, "Sent command: player_toggle...");

        // Let the session task drain the outbound queue.
        for _ in 0..100 {
            if !sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let sent = sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            &[Message::Text(r#"{"command":"player_toggle"}"#.into())]
        );
    }

    #[tokio::test]
    async fn blank_command_while_connected_is_input_error() {
        let (mut conn, mut rx, sent) = recording();
        let session = conn.open("host").unwrap();
        let Some(EngineEvent::Socket { event, .. }) = rx.recv().await else {
            panic!("expected open event");
        };
        conn.on_socket_event(session, &event);

        assert_eq!(send_command(&mut conn, "  "), Err(EngineError::EmptyCommand));
        tokio::task::yield_now().await;
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_command_while_disconnected_is_not_connected() {
        let (mut conn, _rx, _sent) = recording();
        assert_eq!(send_command(&mut conn, ""), Err(EngineError::NotConnected));
        assert_eq!(send_command(&mut conn, "  "), Err(EngineError::NotConnected));
    }

    #[test]
    fn playback_command_names() {
        assert_eq!(PlaybackCommand::Previous.as_str(), "player_prev");
        assert_eq!(PlaybackCommand::Toggle.as_str(), "player_toggle");
        assert_eq!(PlaybackCommand::Next.as_str(), "player_next");
    }

    #[test]
    fn default_vocabulary_has_unique_commands() {
        let actions = default_quick_actions();
        let mut names: Vec<_> = actions.iter().map(|a| a.command.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), actions.len());
    }
}
