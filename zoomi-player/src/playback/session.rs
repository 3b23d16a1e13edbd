//! Session handle and messages
//!
//! A playback session runs as a single task that owns all of its state.
//! Everything that can change that state arrives as a [`PlayerMessage`] on
//! one channel; the host talks to it through a cloneable [`SessionHandle`].

use super::display::{ControlSurface, PlaylistProgress};
use super::resolver::ResolvedExercise;
use super::strategy::CompletionStrategy;
use super::summary::CompletionSummary;
use crate::error::{Error, ResolutionError, Result};
use crate::media::{LoadCompletion, MountedAnimation};
use crate::progress::CompletionAward;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;
use zoomi_common::events::{FinishCause, PlaybackPhase, SessionMode};
use zoomi_common::models::PlaylistEntry;

/// User actions accepted by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserCommand {
    Start,
    /// "I'm done" on a rep prompt
    RepsDone,
    Replay,
    DismissSummary,
    /// Leave the player
    Exit,
}

impl fmt::Display for UserCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserCommand::Start => "start",
            UserCommand::RepsDone => "confirm reps",
            UserCommand::Replay => "replay",
            UserCommand::DismissSummary => "dismiss summary",
            UserCommand::Exit => "exit",
        };
        f.write_str(name)
    }
}

/// Identity of the asynchronous work a message belongs to
///
/// `generation` changes with every resolved exercise, `run` with every
/// start of that exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExerciseTag {
    pub generation: u64,
    pub run: u64,
}

/// Inbound message of the session task
pub enum PlayerMessage {
    Command {
        command: UserCommand,
        reply: oneshot::Sender<Result<SessionSnapshot>>,
    },
    PlaylistLoaded {
        tag: ExerciseTag,
        result: std::result::Result<Vec<PlaylistEntry>, ResolutionError>,
    },
    Resolved {
        tag: ExerciseTag,
        result: std::result::Result<ResolvedExercise, ResolutionError>,
    },
    MediaLoaded {
        tag: ExerciseTag,
        completion: LoadCompletion,
    },
    NarrationEnded {
        tag: ExerciseTag,
    },
    Tick {
        tag: ExerciseTag,
        seconds_remaining: u32,
    },
    Finish {
        tag: ExerciseTag,
        cause: FinishCause,
    },
    ProgressLogged {
        tag: ExerciseTag,
        outcome: Result<CompletionAward>,
    },
    TransitionElapsed {
        tag: ExerciseTag,
    },
}

impl PlayerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PlayerMessage::Command { .. } => "Command",
            PlayerMessage::PlaylistLoaded { .. } => "PlaylistLoaded",
            PlayerMessage::Resolved { .. } => "Resolved",
            PlayerMessage::MediaLoaded { .. } => "MediaLoaded",
            PlayerMessage::NarrationEnded { .. } => "NarrationEnded",
            PlayerMessage::Tick { .. } => "Tick",
            PlayerMessage::Finish { .. } => "Finish",
            PlayerMessage::ProgressLogged { .. } => "ProgressLogged",
            PlayerMessage::TransitionElapsed { .. } => "TransitionElapsed",
        }
    }
}

/// Read-only view of a session for the host
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub mode: Option<SessionMode>,
    pub phase: PlaybackPhase,
    pub control: ControlSurface,
    pub exercise: Option<ResolvedExercise>,
    pub strategy: Option<CompletionStrategy>,
    pub seconds_remaining: Option<u32>,
    pub playlist: Option<PlaylistProgress>,
    pub total_points: u32,
    pub saving: bool,
    pub animation: Option<MountedAnimation>,
    pub summary: Option<CompletionSummary>,
    pub error: Option<String>,
    pub closed: bool,
}

impl SessionSnapshot {
    pub fn loading(session_id: Uuid, mode: Option<SessionMode>) -> Self {
        Self {
            session_id,
            mode,
            phase: PlaybackPhase::Loading,
            control: ControlSurface::Preparing,
            exercise: None,
            strategy: None,
            seconds_remaining: None,
            playlist: None,
            total_points: 0,
            saving: false,
            animation: None,
            summary: None,
            error: None,
            closed: false,
        }
    }
}

/// Host-side handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<PlayerMessage>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: Uuid,
        tx: mpsc::UnboundedSender<PlayerMessage>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            session_id,
            tx,
            snapshot,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshots as they are published
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// The session task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Deliver a user action and wait for the resulting snapshot
    pub async fn send(&self, command: UserCommand) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PlayerMessage::Command { command, reply })
            .map_err(|_| Error::InvalidState("Session is closed".to_string()))?;

        response
            .await
            .map_err(|_| Error::InvalidState("Session is closed".to_string()))?
    }

    pub async fn start(&self) -> Result<SessionSnapshot> {
        self.send(UserCommand::Start).await
    }

    pub async fn reps_done(&self) -> Result<SessionSnapshot> {
        self.send(UserCommand::RepsDone).await
    }

    pub async fn replay(&self) -> Result<SessionSnapshot> {
        self.send(UserCommand::Replay).await
    }

    pub async fn dismiss_summary(&self) -> Result<SessionSnapshot> {
        self.send(UserCommand::DismissSummary).await
    }

    pub async fn exit(&self) -> Result<SessionSnapshot> {
        self.send(UserCommand::Exit).await
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| Error::InvalidState("Session is closed".to_string()))?;
        Ok(snapshot.clone())
    }
}
