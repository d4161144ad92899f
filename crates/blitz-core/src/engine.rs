// Engine state and the main event loop.
//
// `Engine` owns every per-domain aggregate (connection, change store,
// artwork machine, skeleton, output log) and turns socket events, timer
// expiries and user intents into `UiUpdate`s. `run` is the single consumer of
// both input channels, so no two handlers ever run concurrently.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionManager, ConnectionPhase, Transport};
use crate::dispatch;
use crate::error::EngineError;
use crate::output::{OutputKind, OutputLog};
use crate::protocol::{
    decode_frame, EngineEvent, ServerMessage, SessionId, SocketEvent, UiUpdate, UserIntent,
};
use crate::store::ChangeStore;
use crate::transition::{
    ArtworkMachine, ArtworkState, ArtworkStep, SkeletonState, TimerSlot, TransitionToken,
};
use crate::view::{
    project_devices, project_media, project_wifi, status_line, DeviceView, MediaView, StatusLine,
    WifiView,
};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything a front end needs to draw the full screen at once.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineView {
    pub status: StatusLine,
    pub skeleton: SkeletonState,
    pub media: MediaView,
    pub artwork: ArtworkState,
    pub bluetooth: Vec<DeviceView>,
    pub wifi: Option<WifiView>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    conn: ConnectionManager,
    store: ChangeStore,
    artwork: ArtworkMachine,
    skeleton: SkeletonState,
    timer: TimerSlot,
    output: OutputLog,

    // Last values pushed to the UI, used to suppress no-op updates.
    shown_status: StatusLine,
    shown_media: MediaView,
    shown_artwork: ArtworkState,

    /// Frames dropped because they could not be decoded.
    decode_failures: u64,
    pending: Vec<UiUpdate>,
}

impl Engine {
    /// `events` must be the sender half of the channel passed to [`run`] as
    /// `events_rx`; session tasks and transition timers report through it.
    pub fn new(
        transport: Arc<dyn Transport>,
        events: mpsc::Sender<EngineEvent>,
        history: usize,
    ) -> Self {
        Engine {
            conn: ConnectionManager::new(transport, events.clone()),
            store: ChangeStore::new(),
            artwork: ArtworkMachine::new(),
            skeleton: SkeletonState::default(),
            timer: TimerSlot::new(events),
            output: OutputLog::with_capacity(history),
            shown_status: status_line(ConnectionPhase::Idle),
            shown_media: MediaView::waiting(),
            shown_artwork: ArtworkState::default(),
            decode_failures: 0,
            pending: Vec::new(),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.conn.phase()
    }

    pub fn store(&self) -> &ChangeStore {
        &self.store
    }

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    pub fn skeleton(&self) -> SkeletonState {
        self.skeleton
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    pub fn view(&self) -> EngineView {
        EngineView {
            status: status_line(self.conn.phase()),
            skeleton: self.skeleton,
            media: project_media(self.store.media(), self.store.player_name()),
            artwork: self.artwork.state(),
            bluetooth: project_devices(self.store.bluetooth()),
            wifi: self.store.wifi().map(project_wifi),
        }
    }

    /// Take the updates produced since the last call, in order.
    pub fn drain_updates(&mut self) -> Vec<UiUpdate> {
        std::mem::take(&mut self.pending)
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Apply one user intent. `Quit` is the loop's business and is ignored.
    pub fn handle_intent(&mut self, intent: UserIntent) {
        match intent {
            UserIntent::Connect(host) => self.connect(&host),
            UserIntent::Disconnect => self.disconnect(),
            UserIntent::SendCommand(name) => self.send_command(&name),
            UserIntent::Quit => {}
        }
    }

    /// Open a new session to `host`, replacing any existing one.
    ///
    /// Invalid input only produces an output-log entry. A valid address
    /// starts a fresh session: fingerprints are dropped and every transition
    /// from the previous host is voided.
    pub fn connect(&mut self, host: &str) {
        match self.conn.open(host) {
            Ok(session) => {
                debug!("Engine: session {session} started");
                self.store.begin_session();
                self.artwork.reset();
                self.timer.cancel();
                self.sync_artwork();
                self.sync_status();
            }
            Err(e) => {
                warn!("Connect rejected: {}", e);
                self.push_error(&e);
            }
        }
    }

    pub fn disconnect(&mut self) {
        if self.conn.close() {
            info!("Disconnected by user");
        }
        self.sync_status();
    }

    pub fn send_command(&mut self, name: &str) {
        match dispatch::send_command(&mut self.conn, name) {
            Ok(confirmation) => self.push_output(OutputKind::CommandSent, confirmation),
            Err(e) => self.push_error(&e),
        }
        // A dead session task flips the phase to Errored.
        self.sync_status();
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Socket { session, event } => self.handle_socket_event(session, event),
            EngineEvent::TransitionElapsed(token) => self.handle_transition_elapsed(token),
        }
    }

    pub fn handle_socket_event(&mut self, session: SessionId, event: SocketEvent) {
        if !self.conn.is_current(session) {
            debug!("Dropping event from stale session {session}");
            return;
        }

        match event {
            SocketEvent::Opened => {
                self.conn.on_socket_event(session, &event);
                if self.skeleton.show() {
                    self.pending.push(UiUpdate::Skeleton(self.skeleton));
                }
                self.sync_status();
            }
            SocketEvent::Frame(text) => self.handle_frame(&text),
            SocketEvent::Closed => {
                self.conn.on_socket_event(session, &event);
                self.sync_status();
            }
            SocketEvent::Failed(ref reason) => {
                self.conn.on_socket_event(session, &event);
                self.push_error(&EngineError::Transport(reason.clone()));
                self.sync_status();
            }
        }
    }

    pub fn handle_transition_elapsed(&mut self, token: TransitionToken) {
        if self.artwork.complete(token) {
            self.sync_artwork();
        }
    }

    fn handle_frame(&mut self, text: &str) {
        let message = match decode_frame(text) {
            Ok(message) => message,
            Err(e) => {
                self.decode_failures += 1;
                warn!("Dropping frame: {}", e);
                return;
            }
        };
        debug!("Received {} frame", message.kind());

        match message {
            ServerMessage::Player { media, artwork } => {
                if self.skeleton.reveal() {
                    self.pending.push(UiUpdate::Skeleton(self.skeleton));
                }
                self.store.accept_media(media);
                let view = project_media(self.store.media(), self.store.player_name());
                if view != self.shown_media {
                    self.shown_media = view.clone();
                    self.pending.push(UiUpdate::Media(view));
                }
                self.offer_artwork(artwork.as_deref());
            }
            ServerMessage::Bluetooth(devices) => {
                if self.store.offer_bluetooth(devices) {
                    let views = project_devices(self.store.bluetooth());
                    self.pending.push(UiUpdate::Bluetooth(views));
                }
            }
            ServerMessage::Wifi(wifi) => {
                if self.store.offer_wifi(wifi) {
                    let view = self.store.wifi().map(project_wifi);
                    self.pending.push(UiUpdate::Wifi(view));
                }
            }
            ServerMessage::Success(output) => self.push_output(OutputKind::Success, output),
            ServerMessage::Failure { message, output } => {
                warn!("Host reported an error: {}", message);
                self.push_error(&EngineError::Protocol { message, output });
            }
        }
    }

    fn offer_artwork(&mut self, incoming: Option<&str>) {
        match self.artwork.offer(incoming) {
            ArtworkStep::Unchanged => {}
            ArtworkStep::Applied => {
                self.timer.cancel();
                self.sync_artwork();
            }
            ArtworkStep::Scheduled { token, delay } => {
                debug!("Artwork transition scheduled in {:?}", delay);
                self.timer.arm(token, delay);
                self.sync_artwork();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Update helpers
    // -----------------------------------------------------------------------

    fn sync_status(&mut self) {
        let line = status_line(self.conn.phase());
        if line != self.shown_status {
            self.shown_status = line.clone();
            self.pending.push(UiUpdate::Status(line));
        }
    }

    fn sync_artwork(&mut self) {
        let state = self.artwork.state();
        if state != self.shown_artwork {
            self.shown_artwork = state.clone();
            self.pending.push(UiUpdate::Artwork(state));
        }
    }

    fn push_output(&mut self, kind: OutputKind, text: String) {
        let entry = self.output.push(kind, text).clone();
        self.pending.push(UiUpdate::Output(entry));
    }

    fn push_error(&mut self, error: &EngineError) {
        let entry = self.output.push_error(error).clone();
        self.pending.push(UiUpdate::Output(entry));
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the engine until a `Quit` intent arrives or the intent channel closes.
///
/// Listens on two channels using `tokio::select!`:
/// - `events_rx`: socket events and transition timer expiries
/// - `intents_rx`: requests from the front end
///
/// After every handled input, the resulting updates are forwarded to `ui_tx`
/// in order.
pub async fn run(
    mut events_rx: mpsc::Receiver<EngineEvent>,
    mut intents_rx: mpsc::Receiver<UserIntent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut engine: Engine,
) -> anyhow::Result<()> {
    info!("Engine event loop started");

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => engine.handle_event(event),
                None => {
                    warn!("Engine event channel closed, shutting down");
                    break;
                }
            },
            intent = intents_rx.recv() => match intent {
                Some(UserIntent::Quit) | None => {
                    info!("Quit requested, shutting down");
                    break;
                }
                Some(intent) => engine.handle_intent(intent),
            },
        }

        for update in engine.drain_updates() {
            if ui_tx.send(update).await.is_err() {
                info!("UI receiver dropped, shutting down");
                return Ok(());
            }
        }
    }

    engine.disconnect();
    for update in engine.drain_updates() {
        let _ = ui_tx.send(update).await;
    }
    info!("Engine event loop exited");
    Ok(())
}
