// WebSocket connection management for the remote host.
//
// One logical connection at a time. Each `open` starts a new session with a
// fresh id; the session task reports its lifecycle as `EngineEvent::Socket`
// tagged with that id, so events from a replaced session can be told apart
// and dropped.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::protocol::{EngineEvent, SessionId, SocketEvent};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Port the host's remote-control server listens on. Not configurable.
pub const REMOTE_PORT: u16 = 8765;

/// Path of the socket endpoint on the host.
pub const SOCKET_PATH: &str = "/ws";

// ---------------------------------------------------------------------------
// ConnectionPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No connection has been attempted yet.
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    /// The last session ended in a transport error.
    Errored,
}

impl ConnectionPhase {
    pub fn is_connected(self) -> bool {
        self == ConnectionPhase::Connected
    }

    /// A session is opening or open.
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionPhase::Connecting | ConnectionPhase::Connected)
    }
}

// ---------------------------------------------------------------------------
// Address handling
// ---------------------------------------------------------------------------

/// Turn user input into the socket URL: `ws://<host>:8765/ws`.
///
/// Surrounding whitespace and an optional `ws://` prefix are stripped. The
/// port is always appended, so input that already names a port or a path is
/// rejected.
pub fn socket_url(address: &str) -> Result<String, EngineError> {
    let trimmed = address.trim();
    let host = trimmed.strip_prefix("ws://").unwrap_or(trimmed);

    if host.is_empty() {
        return Err(EngineError::EmptyAddress);
    }

    let invalid = |reason: &str| EngineError::InvalidAddress {
        address: trimmed.to_string(),
        reason: reason.to_string(),
    };

    if host.contains("://") {
        return Err(invalid("only plain ws:// connections are supported"));
    }
    if host.contains(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    if host.contains('/') {
        return Err(invalid("must be a bare host, without a path"));
    }

    let host = if host.starts_with('[') {
        if !host.ends_with(']') {
            return Err(invalid("port is fixed and must not be given"));
        }
        host.to_string()
    } else if host.matches(':').count() == 1 {
        return Err(invalid("port is fixed and must not be given"));
    } else if host.contains(':') {
        // Bare IPv6 literal.
        format!("[{host}]")
    } else {
        host.to_string()
    };

    Ok(format!("ws://{host}:{REMOTE_PORT}{SOCKET_PATH}"))
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

pub type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
pub type FrameStream = BoxStream<'static, Result<Message, WsError>>;

/// Opens the underlying message socket. The production implementation is
/// [`WsTransport`]; tests substitute in-memory streams.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str) -> Result<(FrameSink, FrameStream), WsError>;
}

/// Plain `ws://` client backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &str) -> Result<(FrameSink, FrameStream), WsError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();
        Ok((Box::pin(write), read.boxed()))
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

/// Drive one socket session until it ends.
///
/// Reports `Opened` after the handshake, every text frame as `Frame`, and
/// exactly one terminal event (`Closed` or `Failed`) unless the session was
/// closed locally by dropping the outbound sender, in which case a close
/// frame is sent and nothing further is reported.
pub async fn run_session(
    transport: Arc<dyn Transport>,
    url: String,
    session: SessionId,
    events: mpsc::Sender<EngineEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let report = |event: SocketEvent| {
        let events = events.clone();
        async move {
            events
                .send(EngineEvent::Socket { session, event })
                .await
                .is_ok()
        }
    };

    let (mut write, read) = match transport.open(&url).await {
        Ok(halves) => halves,
        Err(e) => {
            report(SocketEvent::Failed(e.to_string())).await;
            return;
        }
    };
    info!("Session {session}: connected to {url}");

    if !report(SocketEvent::Opened).await {
        return;
    }

    let terminal = pump(read, &mut write, &mut outbound, session, &events).await;
    match terminal {
        Some(event) => {
            report(event).await;
        }
        None => {
            if let Err(e) = write.send(Message::Close(None)).await {
                debug!("Session {session}: close frame not sent: {e}");
            }
            debug!("Session {session}: closed locally");
        }
    }
}

/// Shuttle frames in both directions. Returns the terminal event to report,
/// or `None` when the local side closed the session (or the event channel is
/// gone).
async fn pump<R, W>(
    mut read: R,
    write: &mut W,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    session: SessionId,
    events: &mpsc::Sender<EngineEvent>,
) -> Option<SocketEvent>
where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
    W: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let event = EngineEvent::Socket {
                        session,
                        event: SocketEvent::Frame(text.to_string()),
                    };
                    if events.send(event).await.is_err() {
                        return None;
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Session {session}: host sent close frame");
                    return Some(SocketEvent::Closed);
                }
                None => {
                    info!("Session {session}: stream ended");
                    return Some(SocketEvent::Closed);
                }
                Some(Err(e)) => {
                    warn!("Session {session}: read error: {e}");
                    return Some(SocketEvent::Failed(e.to_string()));
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong and raw frames carry nothing for us.
                }
            },
            command = outbound.recv() => match command {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        warn!("Session {session}: send failed: {e}");
                        return Some(SocketEvent::Failed(e.to_string()));
                    }
                }
                None => return None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

struct ActiveSession {
    id: SessionId,
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// Owns the socket lifecycle and the connection phase.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    events: mpsc::Sender<EngineEvent>,
    phase: ConnectionPhase,
    /// Monotonically increasing; bumped on every `open`.
    session: SessionId,
    active: Option<ActiveSession>,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn Transport>, events: mpsc::Sender<EngineEvent>) -> Self {
        ConnectionManager {
            transport,
            events,
            phase: ConnectionPhase::Idle,
            session: 0,
            active: None,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Start a new session to `address`.
    ///
    /// Invalid input is rejected before anything else happens, leaving any
    /// existing session untouched. Otherwise the existing session (if any)
    /// is closed first, and the phase becomes `Connecting`.
    pub fn open(&mut self, address: &str) -> Result<SessionId, EngineError> {
        let url = socket_url(address)?;

        self.close_active();
        self.session += 1;
        let session = self.session;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_session(
            Arc::clone(&self.transport),
            url.clone(),
            session,
            self.events.clone(),
            outbound_rx,
        ));

        self.active = Some(ActiveSession {
            id: session,
            outbound: outbound_tx,
            task,
        });
        self.phase = ConnectionPhase::Connecting;
        info!("Session {session}: connecting to {url}");
        Ok(session)
    }

    /// Close the current session. Safe to call with no session. Returns
    /// `true` if the phase changed.
    pub fn close(&mut self) -> bool {
        let had_session = self.close_active();
        if had_session && self.phase.is_live() {
            self.phase = ConnectionPhase::Disconnected;
            return true;
        }
        false
    }

    /// Whether an event tagged `session` belongs to the live session.
    pub fn is_current(&self, session: SessionId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == session)
    }

    /// Apply a lifecycle event for `session`. Returns `true` if the phase
    /// changed. Events from any other session are ignored.
    pub fn on_socket_event(&mut self, session: SessionId, event: &SocketEvent) -> bool {
        if !self.is_current(session) {
            debug!("Ignoring {event:?} from stale session {session}");
            return false;
        }

        let next = match event {
            SocketEvent::Opened if self.phase == ConnectionPhase::Connecting => {
                ConnectionPhase::Connected
            }
            SocketEvent::Closed => {
                info!("Session {session}: disconnected");
                self.active = None;
                ConnectionPhase::Disconnected
            }
            SocketEvent::Failed(reason) => {
                error!("Session {session}: transport error: {reason}");
                self.active = None;
                ConnectionPhase::Errored
            }
            SocketEvent::Opened | SocketEvent::Frame(_) => return false,
        };

        let changed = next != self.phase;
        self.phase = next;
        changed
    }

    /// Queue a text frame on the live session.
    pub fn send(&mut self, text: String) -> Result<(), EngineError> {
        if !self.phase.is_connected() {
            return Err(EngineError::NotConnected);
        }
        let active = self.active.as_ref().ok_or(EngineError::NotConnected)?;
        // The task may have ended with its terminal event still queued; that
        // event drives the phase change, not this send.
        if active.outbound.send(text).is_err() {
            warn!("Session {}: session task has ended, frame not sent", active.id);
            return Err(EngineError::NotConnected);
        }
        Ok(())
    }

    /// Drop the outbound sender, which makes the session task send a close
    /// frame and exit. Returns whether there was a session.
    fn close_active(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                debug!("Session {}: closing", active.id);
                drop(active.outbound);
                drop(active.task);
                true
            }
            None => false,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}
