// Timed UI transitions: the artwork cross-fade state machine, the loading
// skeleton, and the timer slot that delivers transition deadlines back to
// the engine loop.
//
// Every scheduled transition carries a `TransitionToken` stamped with the
// machine's generation at scheduling time. Any newer intent bumps the
// generation, so a timer that fires late finds a mismatched token and does
// nothing.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::protocol::EngineEvent;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fade window before swapping one artwork for another.
pub const ARTWORK_SWAP_DELAY: Duration = Duration::from_millis(250);

/// Fade window before hiding artwork that went away. Longer than the swap so
/// a short gap between tracks does not blank the panel.
pub const ARTWORK_HIDE_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Identifies one scheduled transition. Only the token matching the current
/// generation may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionToken {
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// Artwork
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkPhase {
    Hidden,
    Showing {
        url: String,
    },
    /// Current artwork is at zero opacity. On completion `next` is shown, or
    /// the panel is hidden when `next` is `None`.
    FadingOut {
        current: String,
        next: Option<String>,
    },
    /// New artwork is waiting to appear after having been hidden earlier in
    /// the session.
    FadingIn {
        url: String,
    },
}

/// What the UI needs to draw the artwork slot.
///
/// `fading` is only true while a transition window is open. When `visible`
/// is false nothing is drawn, whatever `url` holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArtworkState {
    pub url: Option<String>,
    pub visible: bool,
    pub fading: bool,
}

/// Result of offering a new artwork value to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkStep {
    /// Nothing visible changed; any pending transition keeps running.
    Unchanged,
    /// The visible state changed immediately and any pending transition is
    /// void.
    Applied,
    /// A fade started; complete it with `token` after `delay`. Any earlier
    /// pending transition is void.
    Scheduled {
        token: TransitionToken,
        delay: Duration,
    },
}

#[derive(Debug)]
pub struct ArtworkMachine {
    phase: ArtworkPhase,
    generation: u64,
    /// Whether any artwork has been shown since the session began. The very
    /// first artwork appears without a fade.
    shown_this_session: bool,
}

impl Default for ArtworkMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtworkMachine {
    pub fn new() -> Self {
        ArtworkMachine {
            phase: ArtworkPhase::Hidden,
            generation: 0,
            shown_this_session: false,
        }
    }

    pub fn phase(&self) -> &ArtworkPhase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Feed the artwork carried by the latest `player` frame. Empty URLs are
    /// treated as "no artwork".
    pub fn offer(&mut self, incoming: Option<&str>) -> ArtworkStep {
        let incoming = incoming.filter(|url| !url.is_empty()).map(str::to_string);
        let phase = std::mem::replace(&mut self.phase, ArtworkPhase::Hidden);

        match (phase, incoming) {
            (ArtworkPhase::Hidden, None) => self.stay(ArtworkPhase::Hidden),
            (ArtworkPhase::Hidden, Some(url)) if !self.shown_this_session => {
                self.shown_this_session = true;
                self.apply(ArtworkPhase::Showing { url })
            }
            (ArtworkPhase::Hidden, Some(url)) => {
                self.schedule(ArtworkPhase::FadingIn { url }, ARTWORK_SWAP_DELAY)
            }

            (ArtworkPhase::Showing { url }, Some(new)) if url == new => {
                self.stay(ArtworkPhase::Showing { url })
            }
            (ArtworkPhase::Showing { url }, Some(new)) => self.schedule(
                ArtworkPhase::FadingOut {
                    current: url,
                    next: Some(new),
                },
                ARTWORK_SWAP_DELAY,
            ),
            (ArtworkPhase::Showing { url }, None) => self.schedule(
                ArtworkPhase::FadingOut {
                    current: url,
                    next: None,
                },
                ARTWORK_HIDE_DELAY,
            ),

            // Same target already in flight: let the pending timer finish.
            (ArtworkPhase::FadingOut { current, next }, incoming) if next == incoming => {
                self.stay(ArtworkPhase::FadingOut { current, next })
            }
            // The artwork came back before the fade finished.
            (ArtworkPhase::FadingOut { current, .. }, Some(new)) if current == new => {
                self.apply(ArtworkPhase::Showing { url: current })
            }
            (ArtworkPhase::FadingOut { current, .. }, Some(new)) => self.schedule(
                ArtworkPhase::FadingOut {
                    current,
                    next: Some(new),
                },
                ARTWORK_SWAP_DELAY,
            ),
            (ArtworkPhase::FadingOut { current, .. }, None) => self.schedule(
                ArtworkPhase::FadingOut {
                    current,
                    next: None,
                },
                ARTWORK_HIDE_DELAY,
            ),

            (ArtworkPhase::FadingIn { url }, Some(new)) if url == new => {
                self.stay(ArtworkPhase::FadingIn { url })
            }
            (ArtworkPhase::FadingIn { .. }, Some(new)) => {
                self.schedule(ArtworkPhase::FadingIn { url: new }, ARTWORK_SWAP_DELAY)
            }
            (ArtworkPhase::FadingIn { .. }, None) => self.apply(ArtworkPhase::Hidden),
        }
    }

    /// Complete a scheduled transition. Returns `true` if the token was
    /// current and the visible state changed; stale tokens are ignored.
    pub fn complete(&mut self, token: TransitionToken) -> bool {
        if token.generation != self.generation {
            debug!(
                "Discarding stale artwork transition (token gen: {}, current gen: {})",
                token.generation, self.generation
            );
            return false;
        }

        let phase = std::mem::replace(&mut self.phase, ArtworkPhase::Hidden);
        let settled = match phase {
            ArtworkPhase::FadingOut {
                next: Some(url), ..
            }
            | ArtworkPhase::FadingIn { url } => {
                self.shown_this_session = true;
                ArtworkPhase::Showing { url }
            }
            ArtworkPhase::FadingOut { next: None, .. } => ArtworkPhase::Hidden,
            settled @ (ArtworkPhase::Hidden | ArtworkPhase::Showing { .. }) => {
                self.phase = settled;
                return false;
            }
        };

        self.phase = settled;
        // Tokens are single-use.
        self.generation += 1;
        true
    }

    /// Drop everything from the previous session, including any pending
    /// transition.
    pub fn reset(&mut self) {
        self.phase = ArtworkPhase::Hidden;
        self.shown_this_session = false;
        self.generation += 1;
    }

    pub fn state(&self) -> ArtworkState {
        match &self.phase {
            ArtworkPhase::Hidden => ArtworkState::default(),
            ArtworkPhase::Showing { url } => ArtworkState {
                url: Some(url.clone()),
                visible: true,
                fading: false,
            },
            ArtworkPhase::FadingOut { current, .. } => ArtworkState {
                url: Some(current.clone()),
                visible: true,
                fading: true,
            },
            ArtworkPhase::FadingIn { .. } => ArtworkState {
                url: None,
                visible: false,
                fading: true,
            },
        }
    }

    fn stay(&mut self, phase: ArtworkPhase) -> ArtworkStep {
        self.phase = phase;
        ArtworkStep::Unchanged
    }

    fn apply(&mut self, phase: ArtworkPhase) -> ArtworkStep {
        self.phase = phase;
        self.generation += 1;
        ArtworkStep::Applied
    }

    fn schedule(&mut self, phase: ArtworkPhase, delay: Duration) -> ArtworkStep {
        self.phase = phase;
        self.generation += 1;
        ArtworkStep::Scheduled {
            token: TransitionToken {
                generation: self.generation,
            },
            delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Skeleton
// ---------------------------------------------------------------------------

/// Loading placeholder for the player panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkeletonState {
    Shown,
    #[default]
    Hidden,
}

impl SkeletonState {
    /// Show the placeholder (connection opened). Returns `true` on change.
    pub fn show(&mut self) -> bool {
        let changed = *self != SkeletonState::Shown;
        *self = SkeletonState::Shown;
        changed
    }

    /// Reveal real content (first `player` frame). Returns `true` on change.
    pub fn reveal(&mut self) -> bool {
        let changed = *self != SkeletonState::Hidden;
        *self = SkeletonState::Hidden;
        changed
    }
}

// ---------------------------------------------------------------------------
// TimerSlot
// ---------------------------------------------------------------------------

/// Holds at most one pending transition timer. Arming a new timer aborts the
/// previous one; the token check in [`ArtworkMachine::complete`] covers the
/// case where the old timer already posted its event.
pub struct TimerSlot {
    events: mpsc::Sender<EngineEvent>,
    pending: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(events: mpsc::Sender<EngineEvent>) -> Self {
        TimerSlot {
            events,
            pending: None,
        }
    }

    pub fn arm(&mut self, token: TransitionToken, delay: Duration) {
        self.cancel();
        let tx = self.events.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(EngineEvent::TransitionElapsed(token)).await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
