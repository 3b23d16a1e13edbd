//! Event types for the Zoomi event system
//!
//! Provides the shared event definitions and the EventBus used by the
//! player and its host surfaces.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Phase of an exercise playback session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// Resolving the exercise and waiting on media readiness
    Loading,
    /// Start is enabled
    Ready,
    /// Animation running, one completion strategy armed
    Playing,
    /// Progress log call outstanding
    Finishing,
    /// Brief pause between playlist entries
    Transitioning,
    /// Session finished, summary shown
    Completed,
    /// Exercise or workout could not be resolved
    Error,
}

impl PlaybackPhase {
    /// No further transitions except replay/dismiss/back
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackPhase::Completed | PlaybackPhase::Error)
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlaybackPhase::Loading => "Loading",
            PlaybackPhase::Ready => "Ready",
            PlaybackPhase::Playing => "Playing",
            PlaybackPhase::Finishing => "Finishing",
            PlaybackPhase::Transitioning => "Transitioning",
            PlaybackPhase::Completed => "Completed",
            PlaybackPhase::Error => "Error",
        };
        f.write_str(name)
    }
}

/// What ended a playing exercise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishCause {
    TimerElapsed,
    RepsConfirmed,
    NarrationEnded,
    FixedDelayElapsed,
}

/// How the session was addressed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    LibraryItem,
    Exercise,
    Playlist,
}

/// Zoomi event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ZoomiEvent {
    /// A playback session was opened by the host
    SessionStarted {
        session_id: Uuid,
        mode: SessionMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session phase changed
    PhaseChanged {
        session_id: Uuid,
        old_phase: PlaybackPhase,
        new_phase: PlaybackPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new exercise became the active one
    ExerciseResolved {
        session_id: Uuid,
        exercise_id: Uuid,
        title: String,
        /// Playlist cursor position (None outside playlist mode)
        position: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Countdown advanced by one second
    CountdownTick {
        session_id: Uuid,
        seconds_remaining: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The playing exercise finished
    ExerciseFinished {
        session_id: Uuid,
        exercise_id: Uuid,
        cause: FinishCause,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Points were credited for a finished exercise
    PointsAwarded {
        session_id: Uuid,
        exercise_id: Uuid,
        points: u32,
        /// True when the remote award could not be confirmed
        fallback: bool,
        session_total: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playlist cursor moved forward
    PlaylistAdvanced {
        session_id: Uuid,
        index: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All exercises of the session are done
    SessionCompleted {
        session_id: Uuid,
        total_points: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session torn down (navigation away or replaced)
    SessionClosed {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ZoomiEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ZoomiEvent::SessionStarted { .. } => "SessionStarted",
            ZoomiEvent::PhaseChanged { .. } => "PhaseChanged",
            ZoomiEvent::ExerciseResolved { .. } => "ExerciseResolved",
            ZoomiEvent::CountdownTick { .. } => "CountdownTick",
            ZoomiEvent::ExerciseFinished { .. } => "ExerciseFinished",
            ZoomiEvent::PointsAwarded { .. } => "PointsAwarded",
            ZoomiEvent::PlaylistAdvanced { .. } => "PlaylistAdvanced",
            ZoomiEvent::SessionCompleted { .. } => "SessionCompleted",
            ZoomiEvent::SessionClosed { .. } => "SessionClosed",
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            ZoomiEvent::SessionStarted { session_id, .. }
            | ZoomiEvent::PhaseChanged { session_id, .. }
            | ZoomiEvent::ExerciseResolved { session_id, .. }
            | ZoomiEvent::CountdownTick { session_id, .. }
            | ZoomiEvent::ExerciseFinished { session_id, .. }
            | ZoomiEvent::PointsAwarded { session_id, .. }
            | ZoomiEvent::PlaylistAdvanced { session_id, .. }
            | ZoomiEvent::SessionCompleted { session_id, .. }
            | ZoomiEvent::SessionClosed { session_id, .. } => *session_id,
        }
    }
}

/// One-to-many event broadcasting (tokio::broadcast)
pub struct EventBus {
    tx: broadcast::Sender<ZoomiEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ZoomiEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ZoomiEvent,
    ) -> Result<usize, broadcast::error::SendError<ZoomiEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ZoomiEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
