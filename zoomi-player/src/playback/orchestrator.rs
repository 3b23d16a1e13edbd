//! Playback orchestrator
//!
//! Drives one playback session through its phases:
//!
//! ```text
//! Loading -> Ready -> Playing -> Finishing -> Transitioning -> Loading ...
//!                                          \-> Completed -(replay)-> Ready
//! Loading -> Error
//! ```
//!
//! The session is a single task that owns all of its state. Timers, media
//! loads, catalog lookups and the completion log run as separate tasks and
//! report back through the session channel, each message tagged with the
//! exercise (and playback run) it was issued for. Messages whose tag is no
//! longer current are dropped.

use super::display::{ControlSurface, PlaylistProgress, SurfaceInputs};
use super::playlist::{fetch_workout, PlaylistQueue};
use super::resolver::{ExerciseAddress, ExerciseResolver, ResolvedExercise};
use super::session::{
    ExerciseTag, PlayerMessage, SessionHandle, SessionSnapshot, UserCommand,
};
use super::strategy::{ArmedStrategy, CompletionStrategy};
use super::summary::{Award, CompletionSummary, PointsLedger};
use crate::config::PlayerConfig;
use crate::error::{Error, ResolutionError, Result};
use crate::media::{
    AnimationStage, AnimationSurface, AudioBackend, GateStatus, LoadCompletion, NarrationRequest,
    ReadinessGate,
};
use crate::progress::{CompletionAward, ProgressLogger};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zoomi_common::events::{EventBus, FinishCause, PlaybackPhase, SessionMode, ZoomiEvent};
use zoomi_common::models::PlaylistEntry;
use zoomi_common::Locale;

/// Collaborators shared by all sessions
#[derive(Clone)]
pub struct PlayerDeps {
    pub resolver: Arc<ExerciseResolver>,
    pub audio: Arc<dyn AudioBackend>,
    pub animation: Arc<dyn AnimationSurface>,
    pub progress: Arc<dyn ProgressLogger>,
    pub events: Arc<EventBus>,
    pub config: PlayerConfig,
}

/// What the host asked to play
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionRequest {
    pub library_item_id: Option<Uuid>,
    pub exercise_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    /// Acting user, passed to the completion log
    pub user_id: Option<Uuid>,
}

/// Open a playback session and start resolving its first exercise
///
/// `locale` is read at every resolution, so a change applies from the next
/// exercise on.
pub fn spawn_session(
    deps: PlayerDeps,
    request: SessionRequest,
    locale: watch::Receiver<Locale>,
) -> SessionHandle {
    let session_id = Uuid::new_v4();
    let address = ExerciseAddress::from_refs(
        request.library_item_id,
        request.exercise_id,
        request.plan_id,
    );
    let mode = address.as_ref().ok().map(|a| match a {
        ExerciseAddress::LibraryItem { .. } => SessionMode::LibraryItem,
        ExerciseAddress::Exercise { .. } => SessionMode::Exercise,
        ExerciseAddress::Playlist { .. } => SessionMode::Playlist,
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::loading(session_id, mode));

    let mut session = PlaybackSession {
        id: session_id,
        mode,
        user_id: request.user_id,
        phase: PlaybackPhase::Loading,
        tag: ExerciseTag::default(),
        exercise: None,
        playlist: None,
        ledger: PointsLedger::default(),
        log_outstanding: false,
        strategy: None,
        seconds_remaining: None,
        gate: ReadinessGate::new(deps.audio.clone()),
        stage: AnimationStage::new(deps.animation.clone()),
        error: None,
        summary: None,
        closed: false,
        notifier: Notifier {
            tx: tx.downgrade(),
        },
        snapshot_tx,
        locale,
        deps,
    };

    if let Some(mode) = mode {
        info!(session_id = %session_id, ?mode, "Playback session opened");
        session.emit(ZoomiEvent::SessionStarted {
            session_id,
            mode,
            timestamp: Utc::now(),
        });
    }

    session.begin(address);
    session.publish();

    tokio::spawn(session.run(rx));

    SessionHandle::new(session_id, tx, snapshot_rx)
}

/// Weak sender used by background tasks to report back
///
/// Holding it does not keep the session alive.
#[derive(Clone)]
struct Notifier {
    tx: mpsc::WeakUnboundedSender<PlayerMessage>,
}

impl Notifier {
    fn send(&self, message: PlayerMessage) {
        match self.tx.upgrade() {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => debug!("Session gone, dropping {} message", message.kind()),
        }
    }
}

struct PlaybackSession {
    id: Uuid,
    mode: Option<SessionMode>,
    user_id: Option<Uuid>,
    phase: PlaybackPhase,
    tag: ExerciseTag,
    exercise: Option<ResolvedExercise>,
    playlist: Option<PlaylistQueue>,
    ledger: PointsLedger,
    /// Completion log in flight; start and replay are hidden meanwhile
    log_outstanding: bool,
    strategy: Option<ArmedStrategy>,
    seconds_remaining: Option<u32>,
    gate: ReadinessGate,
    stage: AnimationStage,
    error: Option<ResolutionError>,
    summary: Option<CompletionSummary>,
    closed: bool,
    notifier: Notifier,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    locale: watch::Receiver<Locale>,
    deps: PlayerDeps,
}

impl PlaybackSession {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PlayerMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle(message);
            self.publish();
            if self.closed {
                break;
            }
        }

        if !self.closed {
            debug!(session_id = %self.id, "All session handles dropped");
            self.teardown();
            self.publish();
        }
    }

    fn handle(&mut self, message: PlayerMessage) {
        match message {
            PlayerMessage::Command { command, reply } => {
                let result = self.on_command(command).map(|_| self.snapshot());
                let _ = reply.send(result);
            }
            PlayerMessage::PlaylistLoaded { tag, result } => {
                if self.accept_generation(tag, "PlaylistLoaded") {
                    self.on_playlist_loaded(result);
                }
            }
            PlayerMessage::Resolved { tag, result } => {
                if self.accept_generation(tag, "Resolved") {
                    self.on_resolved(result);
                }
            }
            PlayerMessage::MediaLoaded { tag, completion } => self.on_media_loaded(tag, completion),
            PlayerMessage::NarrationEnded { tag } => {
                if self.accept_generation(tag, "NarrationEnded") {
                    self.on_finish(self.tag, FinishCause::NarrationEnded);
                }
            }
            PlayerMessage::Tick {
                tag,
                seconds_remaining,
            } => self.on_tick(tag, seconds_remaining),
            PlayerMessage::Finish { tag, cause } => self.on_finish(tag, cause),
            PlayerMessage::ProgressLogged { tag, outcome } => self.on_progress_logged(tag, outcome),
            PlayerMessage::TransitionElapsed { tag } => {
                if self.accept_generation(tag, "TransitionElapsed") {
                    self.on_transition_elapsed();
                }
            }
        }
    }

    fn accept_generation(&self, tag: ExerciseTag, kind: &str) -> bool {
        if tag.generation == self.tag.generation {
            true
        } else {
            debug!(
                session_id = %self.id,
                message = kind,
                stale = tag.generation,
                current = self.tag.generation,
                "Discarding message for superseded exercise"
            );
            false
        }
    }

    fn in_playlist(&self) -> bool {
        self.playlist.is_some()
    }

    fn current_locale(&self) -> Locale {
        *self.locale.borrow()
    }

    // Loading

    fn begin(&mut self, address: std::result::Result<ExerciseAddress, ResolutionError>) {
        let address = match address {
            Ok(address) => address,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let tag = self.tag;
        let notifier = self.notifier.clone();
        let resolver = self.deps.resolver.clone();
        let locale = self.current_locale();

        match address {
            ExerciseAddress::Playlist { plan_id } => {
                let mut queue = PlaylistQueue::new(plan_id);
                queue.begin_load();
                self.playlist = Some(queue);
                tokio::spawn(async move {
                    let result = fetch_workout(resolver.catalog().as_ref(), plan_id).await;
                    notifier.send(PlayerMessage::PlaylistLoaded { tag, result });
                });
            }
            ExerciseAddress::LibraryItem { id } => {
                tokio::spawn(async move {
                    let result = resolver.resolve_library_item(id, locale).await;
                    notifier.send(PlayerMessage::Resolved { tag, result });
                });
            }
            ExerciseAddress::Exercise { id } => {
                tokio::spawn(async move {
                    let result = resolver.resolve_exercise(id, locale).await;
                    notifier.send(PlayerMessage::Resolved { tag, result });
                });
            }
        }
    }

    fn on_playlist_loaded(
        &mut self,
        result: std::result::Result<Vec<PlaylistEntry>, ResolutionError>,
    ) {
        let Some(queue) = self.playlist.as_mut() else {
            return;
        };
        queue.apply(result.clone());

        match result {
            Ok(_) => self.resolve_playlist_entry(),
            Err(e) => self.fail(e),
        }
    }

    fn resolve_playlist_entry(&mut self) {
        let locale = self.current_locale();
        let resolved = self
            .playlist
            .as_ref()
            .and_then(|q| q.current_item())
            .map(|entry| self.deps.resolver.from_playlist_entry(entry, locale));

        match resolved {
            Some(exercise) => self.on_resolved(Ok(exercise)),
            None => self.fail(ResolutionError::WorkoutEmpty),
        }
    }

    fn on_resolved(&mut self, result: std::result::Result<ResolvedExercise, ResolutionError>) {
        if self.phase != PlaybackPhase::Loading {
            debug!(session_id = %self.id, phase = %self.phase, "Resolution arrived outside Loading");
            return;
        }

        let exercise = match result {
            Ok(exercise) => exercise,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let position = self.playlist.as_ref().map(|q| q.current_index());
        info!(
            session_id = %self.id,
            exercise_id = %exercise.exercise_id,
            title = %exercise.title,
            ?position,
            "Exercise resolved"
        );
        self.emit(ZoomiEvent::ExerciseResolved {
            session_id: self.id,
            exercise_id: exercise.exercise_id,
            title: exercise.title.clone(),
            position,
            timestamp: Utc::now(),
        });

        let request = NarrationRequest {
            url: exercise.audio_url.clone(),
            enabled: exercise.enable_audio,
        };
        self.exercise = Some(exercise);

        let tag = self.tag;
        let end_notifier = self.notifier.clone();
        let load_notifier = self.notifier.clone();
        let status = self.gate.load(
            request,
            move || end_notifier.send(PlayerMessage::NarrationEnded { tag }),
            move |completion| load_notifier.send(PlayerMessage::MediaLoaded { tag, completion }),
        );

        if status == GateStatus::Ready {
            self.enter_ready();
        }
    }

    fn on_media_loaded(&mut self, tag: ExerciseTag, completion: LoadCompletion) {
        // The gate discards (and unloads) completions of superseded loads
        let applied = self.gate.complete(completion);
        if applied && tag.generation == self.tag.generation && self.phase == PlaybackPhase::Loading {
            self.enter_ready();
        }
    }

    fn enter_ready(&mut self) {
        if !self.gate.is_ready() || self.exercise.is_none() {
            debug!(session_id = %self.id, "Not ready yet");
            return;
        }
        self.set_phase(PlaybackPhase::Ready);
    }

    // Commands

    fn on_command(&mut self, command: UserCommand) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("Session is closed".to_string()));
        }

        match command {
            UserCommand::Start => self.start(),
            UserCommand::RepsDone => self.confirm_reps(),
            UserCommand::Replay => self.replay(),
            UserCommand::DismissSummary => self.dismiss_summary(),
            UserCommand::Exit => {
                self.teardown();
                Ok(())
            }
        }
    }

    fn reject(&self, command: UserCommand) -> Error {
        let reason = if self.log_outstanding {
            "saving progress".to_string()
        } else {
            format!("phase is {}", self.phase)
        };
        Error::InvalidState(format!("Cannot {} while {}", command, reason))
    }

    fn start(&mut self) -> Result<()> {
        if self.phase != PlaybackPhase::Ready || self.log_outstanding {
            return Err(self.reject(UserCommand::Start));
        }
        let Some(exercise) = self.exercise.clone() else {
            return Err(self.reject(UserCommand::Start));
        };

        self.tag.run += 1;
        let tag = self.tag;

        let strategy = CompletionStrategy::choose(
            &exercise,
            self.in_playlist(),
            self.gate.has_audio(),
            self.deps.config.fixed_delay(),
        );

        if exercise.enable_animation {
            self.stage.start(&exercise.animation_id);
        }
        self.gate.play_audio();

        let tick_notifier = self.notifier.clone();
        let finish_notifier = self.notifier.clone();
        let armed = ArmedStrategy::arm(
            strategy,
            move |seconds_remaining| {
                tick_notifier.send(PlayerMessage::Tick {
                    tag,
                    seconds_remaining,
                })
            },
            move |cause| finish_notifier.send(PlayerMessage::Finish { tag, cause }),
        );
        self.seconds_remaining = armed.remaining();
        self.strategy = Some(armed);

        info!(
            session_id = %self.id,
            exercise_id = %exercise.exercise_id,
            ?strategy,
            "Playback started"
        );
        self.set_phase(PlaybackPhase::Playing);
        Ok(())
    }

    fn confirm_reps(&mut self) -> Result<()> {
        let prompting = matches!(
            self.strategy.as_ref().map(|s| s.strategy()),
            Some(CompletionStrategy::RepPrompt { .. })
        );
        if self.phase != PlaybackPhase::Playing || !prompting {
            return Err(self.reject(UserCommand::RepsDone));
        }
        self.on_finish(self.tag, FinishCause::RepsConfirmed);
        Ok(())
    }

    fn replay(&mut self) -> Result<()> {
        let dismissed = self.summary.is_some_and(|s| s.dismissed);
        if self.phase != PlaybackPhase::Completed
            || !dismissed
            || self.in_playlist()
            || self.log_outstanding
        {
            return Err(self.reject(UserCommand::Replay));
        }

        self.strategy = None;
        self.seconds_remaining = None;
        self.gate.reset_audio();
        self.stage.stop();
        self.summary = None;

        info!(session_id = %self.id, "Replaying exercise");
        self.set_phase(PlaybackPhase::Ready);
        Ok(())
    }

    fn dismiss_summary(&mut self) -> Result<()> {
        if self.phase != PlaybackPhase::Completed {
            return Err(self.reject(UserCommand::DismissSummary));
        }

        if self.in_playlist() {
            self.teardown();
        } else if let Some(summary) = self.summary.as_mut() {
            summary.dismissed = true;
        }
        Ok(())
    }

    // Playing

    fn on_tick(&mut self, tag: ExerciseTag, seconds_remaining: u32) {
        if tag != self.tag || self.phase != PlaybackPhase::Playing {
            return;
        }
        self.seconds_remaining = Some(seconds_remaining);
        self.emit(ZoomiEvent::CountdownTick {
            session_id: self.id,
            seconds_remaining,
            timestamp: Utc::now(),
        });
    }

    fn on_finish(&mut self, tag: ExerciseTag, cause: FinishCause) {
        if tag != self.tag || self.phase != PlaybackPhase::Playing {
            debug!(session_id = %self.id, ?cause, phase = %self.phase, "Ignoring finish");
            return;
        }

        let armed = self.strategy.as_ref().map(|s| s.strategy());
        let matches_strategy = matches!(
            (armed, cause),
            (Some(CompletionStrategy::Timer { .. }), FinishCause::TimerElapsed)
                | (Some(CompletionStrategy::RepPrompt { .. }), FinishCause::RepsConfirmed)
                | (Some(CompletionStrategy::AudioEnd), FinishCause::NarrationEnded)
                | (Some(CompletionStrategy::FixedDelay { .. }), FinishCause::FixedDelayElapsed)
        );
        if !matches_strategy {
            debug!(session_id = %self.id, ?cause, ?armed, "Finish does not match armed strategy");
            return;
        }

        let Some(exercise_id) = self.exercise.as_ref().map(|e| e.exercise_id) else {
            return;
        };

        self.strategy = None;
        self.gate.reset_audio();
        self.stage.stop();

        info!(session_id = %self.id, exercise_id = %exercise_id, ?cause, "Exercise finished");
        self.emit(ZoomiEvent::ExerciseFinished {
            session_id: self.id,
            exercise_id,
            cause,
            timestamp: Utc::now(),
        });

        self.log_outstanding = true;
        self.set_phase(PlaybackPhase::Finishing);

        let progress = self.deps.progress.clone();
        let timeout = self.deps.config.progress_timeout();
        let notifier = self.notifier.clone();
        let user_id = self.user_id;
        tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(timeout, progress.log_completion(exercise_id, user_id))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Progress(format!(
                        "Timed out after {} ms",
                        timeout.as_millis()
                    ))),
                };
            notifier.send(PlayerMessage::ProgressLogged { tag, outcome });
        });
    }

    // Finishing

    fn on_progress_logged(&mut self, tag: ExerciseTag, outcome: Result<CompletionAward>) {
        if tag != self.tag || self.phase != PlaybackPhase::Finishing {
            debug!(session_id = %self.id, "Discarding completion log result");
            return;
        }

        let Some(exercise_id) = self.exercise.as_ref().map(|e| e.exercise_id) else {
            return;
        };

        let award = match outcome {
            Ok(award) => Award {
                exercise_id,
                points: award.points,
                fallback: false,
            },
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    exercise_id = %exercise_id,
                    fallback = self.deps.config.fallback_award,
                    "Completion log failed, crediting fallback: {}",
                    e
                );
                Award {
                    exercise_id,
                    points: self.deps.config.fallback_award,
                    fallback: true,
                }
            }
        };

        self.log_outstanding = false;
        let session_total = self.ledger.credit(award);
        self.emit(ZoomiEvent::PointsAwarded {
            session_id: self.id,
            exercise_id,
            points: award.points,
            fallback: award.fallback,
            session_total,
            timestamp: Utc::now(),
        });

        let has_next = self
            .playlist
            .as_ref()
            .is_some_and(|q| !q.is_last_exercise());

        if has_next {
            self.set_phase(PlaybackPhase::Transitioning);
            let transition = self.deps.config.transition();
            let notifier = self.notifier.clone();
            tokio::spawn(async move {
                tokio::time::sleep(transition).await;
                notifier.send(PlayerMessage::TransitionElapsed { tag });
            });
        } else {
            self.complete();
        }
    }

    fn on_transition_elapsed(&mut self) {
        if self.phase != PlaybackPhase::Transitioning {
            return;
        }

        let advanced = self
            .playlist
            .as_mut()
            .map(|q| (q.advance_to_next(), q.current_index(), q.total_count()));

        match advanced {
            Some((true, index, total)) => {
                info!(session_id = %self.id, index, total, "Advancing playlist");
                self.emit(ZoomiEvent::PlaylistAdvanced {
                    session_id: self.id,
                    index,
                    total,
                    timestamp: Utc::now(),
                });

                self.tag = ExerciseTag {
                    generation: self.tag.generation + 1,
                    run: 0,
                };
                self.exercise = None;
                self.seconds_remaining = None;
                self.gate.release();
                self.set_phase(PlaybackPhase::Loading);
                self.resolve_playlist_entry();
            }
            _ => self.complete(),
        }
    }

    fn complete(&mut self) {
        let summary = CompletionSummary::from_ledger(&self.ledger);
        info!(session_id = %self.id, total_points = summary.total_points, "Session completed");
        self.summary = Some(summary);
        self.set_phase(PlaybackPhase::Completed);
        self.emit(ZoomiEvent::SessionCompleted {
            session_id: self.id,
            total_points: summary.total_points,
            timestamp: Utc::now(),
        });
    }

    // Error / teardown

    fn fail(&mut self, e: ResolutionError) {
        error!(session_id = %self.id, "Failed to resolve exercise: {}", e);
        self.strategy = None;
        self.gate.release();
        self.stage.stop();
        self.error = Some(e);
        self.set_phase(PlaybackPhase::Error);
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.strategy = None;
        self.seconds_remaining = None;
        self.gate.release();
        self.stage.stop();
        // A completion log already issued may still finish; its result is dropped
        self.tag.generation += 1;

        info!(session_id = %self.id, phase = %self.phase, "Playback session closed");
        self.emit(ZoomiEvent::SessionClosed {
            session_id: self.id,
            timestamp: Utc::now(),
        });
    }

    // Publishing

    fn set_phase(&mut self, new_phase: PlaybackPhase) {
        let old_phase = self.phase;
        if old_phase == new_phase {
            return;
        }
        self.phase = new_phase;
        debug!(session_id = %self.id, %old_phase, %new_phase, "Phase changed");
        self.emit(ZoomiEvent::PhaseChanged {
            session_id: self.id,
            old_phase,
            new_phase,
            timestamp: Utc::now(),
        });
    }

    fn emit(&self, event: ZoomiEvent) {
        self.deps.events.emit_lossy(event);
    }

    fn snapshot(&self) -> SessionSnapshot {
        let strategy = self.strategy.as_ref().map(|s| s.strategy());
        let error = self.error.as_ref().map(|e| e.to_string());
        let control = ControlSurface::for_state(&SurfaceInputs {
            phase: self.phase,
            strategy,
            seconds_remaining: self.seconds_remaining,
            log_outstanding: self.log_outstanding,
            in_playlist: self.in_playlist(),
            summary_dismissed: self.summary.is_some_and(|s| s.dismissed),
            total_points: self.ledger.total(),
            error: error.as_deref(),
        });

        SessionSnapshot {
            session_id: self.id,
            mode: self.mode,
            phase: self.phase,
            control,
            exercise: self.exercise.clone(),
            strategy,
            seconds_remaining: self.seconds_remaining,
            playlist: self
                .playlist
                .as_ref()
                .filter(|q| q.total_count() > 0)
                .map(|q| PlaylistProgress::new(q.current_index(), q.total_count())),
            total_points: self.ledger.total(),
            saving: self.log_outstanding,
            animation: self.stage.current().cloned(),
            summary: self.summary,
            error,
            closed: self.closed,
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
