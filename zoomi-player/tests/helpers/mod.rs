//! Test helpers for zoomi-player integration tests
//!
//! In-memory stand-ins for every collaborator of the orchestrator:
//! - FakeCatalog: exercises, library items and workouts held in maps
//! - ScriptedAudioBackend: narration with configurable latency, failure and length
//! - ScriptedProgressLogger: completion log with queued replies
//! - RecordingAnimationSurface: remembers mount/unmount calls

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;
use zoomi_common::events::{EventBus, PlaybackPhase, ZoomiEvent};
use zoomi_common::models::{
    EntryCompletion, ExerciseDefinition, ExerciseStatus, LibraryItem, PlaylistEntry,
};
use zoomi_common::{Locale, Localized};
use zoomi_player::catalog::ExerciseCatalog;
use zoomi_player::config::PlayerConfig;
use zoomi_player::error::{Error, Result};
use zoomi_player::media::{AnimationSurface, AudioBackend, AudioTrack, ClockedTrack, EndSignal};
use zoomi_player::playback::{
    spawn_session, AudioUrlBuilder, ExerciseResolver, PlayerDeps, SessionHandle, SessionRequest,
    SessionSnapshot,
};
use zoomi_player::progress::{CompletionAward, ProgressLogger};

pub const STORAGE: &str = "https://storage.test";

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct FakeCatalog {
    exercises: Mutex<HashMap<Uuid, ExerciseDefinition>>,
    items: Mutex<HashMap<Uuid, LibraryItem>>,
    workouts: Mutex<HashMap<Uuid, Vec<PlaylistEntry>>>,
    pub lookups: AtomicUsize,
}

impl FakeCatalog {
    pub fn add_exercise(&self, exercise: ExerciseDefinition) -> Uuid {
        let id = exercise.id;
        self.exercises.lock().unwrap().insert(id, exercise);
        id
    }

    pub fn add_library_item(&self, exercise: ExerciseDefinition, enable_audio: bool) -> Uuid {
        let item = LibraryItem {
            id: Uuid::new_v4(),
            exercise,
            category_name: "Warmup".to_string(),
            category_color: "#10B981".to_string(),
            enable_audio,
            enable_animation: true,
            sort_order: 0,
        };
        let id = item.id;
        self.items.lock().unwrap().insert(id, item);
        id
    }

    /// Register a workout whose entries use the given completions, in order
    pub fn add_workout(&self, entries: Vec<(ExerciseDefinition, EntryCompletion)>) -> Uuid {
        let plan_id = Uuid::new_v4();
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(i, (exercise, completion))| PlaylistEntry {
                workout_item_id: Uuid::new_v4(),
                plan_id,
                exercise,
                sequence_order: i as i64,
                completion,
            })
            .collect();
        self.workouts.lock().unwrap().insert(plan_id, entries);
        plan_id
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExerciseCatalog for FakeCatalog {
    async fn library_item(&self, id: Uuid) -> Result<Option<LibraryItem>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn exercise(&self, id: Uuid) -> Result<Option<ExerciseDefinition>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.exercises.lock().unwrap().get(&id).cloned())
    }

    async fn workout_entries(&self, plan_id: Uuid) -> Result<Vec<PlaylistEntry>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.workouts
            .lock()
            .unwrap()
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Workout {}", plan_id)))
    }
}

pub fn exercise(title: &str, audio: bool) -> ExerciseDefinition {
    let slug = title.to_lowercase().replace(' ', "-");
    ExerciseDefinition {
        id: Uuid::new_v4(),
        animation_id: slug.clone(),
        icon_id: None,
        title: Localized::new(title.to_string(), format!("{} (he)", title)),
        description: Localized::new(Some(format!("{} description", title)), None),
        audio_path: if audio {
            Localized::new(
                Some(format!("en/{}.mp3", slug)),
                Some(format!("he/{}.mp3", slug)),
            )
        } else {
            Localized::new(None, None)
        },
        status: ExerciseStatus::Active,
    }
}

// ============================================================================
// Narration
// ============================================================================

#[derive(Default)]
pub struct AudioStats {
    pub loads: Mutex<Vec<String>>,
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub unloads: AtomicUsize,
}

pub struct ScriptedAudioBackend {
    pub latency: Duration,
    pub length: Duration,
    pub fail: bool,
    pub stats: Arc<AudioStats>,
}

impl ScriptedAudioBackend {
    pub fn new(latency: Duration, length: Duration) -> Self {
        Self {
            latency,
            length,
            fail: false,
            stats: Arc::new(AudioStats::default()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Duration::from_millis(50), Duration::from_secs(1))
        }
    }
}

struct CountingTrack {
    inner: ClockedTrack,
    stats: Arc<AudioStats>,
}

impl AudioTrack for CountingTrack {
    fn play_from_start(&mut self) -> Result<()> {
        self.stats.plays.fetch_add(1, Ordering::SeqCst);
        self.inner.play_from_start()
    }

    fn stop(&mut self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }

    fn unload(&mut self) {
        self.stats.unloads.fetch_add(1, Ordering::SeqCst);
        self.inner.unload();
    }
}

#[async_trait]
impl AudioBackend for ScriptedAudioBackend {
    async fn load(&self, url: &str, on_end: EndSignal) -> Result<Box<dyn AudioTrack>> {
        self.stats.loads.lock().unwrap().push(url.to_string());
        tokio::time::sleep(self.latency).await;
        if self.fail {
            return Err(Error::Media(format!("GET {} returned 404 Not Found", url)));
        }
        Ok(Box::new(CountingTrack {
            inner: ClockedTrack::new(self.length, on_end),
            stats: self.stats.clone(),
        }))
    }
}

// ============================================================================
// Progress log
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Award(u32),
    Reject,
    /// Never answers (exercises the timeout)
    Hang,
}

pub struct ScriptedProgressLogger {
    replies: Mutex<VecDeque<Reply>>,
    default: Reply,
    pub calls: Mutex<Vec<(Uuid, Option<Uuid>)>>,
}

impl ScriptedProgressLogger {
    pub fn always(reply: Reply) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default: reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn sequence(replies: Vec<Reply>, default: Reply) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            default,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProgressLogger for ScriptedProgressLogger {
    async fn log_completion(&self, exercise_id: Uuid, user_id: Option<Uuid>) -> Result<CompletionAward> {
        self.calls.lock().unwrap().push((exercise_id, user_id));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default);

        match reply {
            Reply::Award(points) => Ok(CompletionAward { points }),
            Reply::Reject => Err(Error::Progress("Backend rejected completion".to_string())),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Default)]
pub struct RecordingAnimationSurface {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingAnimationSurface {
    pub fn mounts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("mount"))
            .cloned()
            .collect()
    }
}

impl AnimationSurface for RecordingAnimationSurface {
    fn mount(&self, animation_id: &str, key: u64) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("mount {} {}", animation_id, key));
    }

    fn unmount(&self, key: u64) {
        self.calls.lock().unwrap().push(format!("unmount {}", key));
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub catalog: Arc<FakeCatalog>,
    pub audio: Arc<ScriptedAudioBackend>,
    pub progress: Arc<ScriptedProgressLogger>,
    pub animation: Arc<RecordingAnimationSurface>,
    pub events: Arc<EventBus>,
    pub locale_tx: watch::Sender<Locale>,
    pub config: PlayerConfig,
}

impl Harness {
    pub fn new(audio: ScriptedAudioBackend, progress: ScriptedProgressLogger) -> Self {
        let (locale_tx, _) = watch::channel(Locale::En);
        Self {
            catalog: Arc::new(FakeCatalog::default()),
            audio: Arc::new(audio),
            progress: Arc::new(progress),
            animation: Arc::new(RecordingAnimationSurface::default()),
            events: Arc::new(EventBus::new(512)),
            locale_tx,
            config: PlayerConfig {
                locale: Locale::En,
                ..PlayerConfig::default()
            },
        }
    }

    /// Narration loads in 100 ms and lasts 3 s; every completion earns 8
    pub fn standard() -> Self {
        Self::new(
            ScriptedAudioBackend::new(Duration::from_millis(100), Duration::from_secs(3)),
            ScriptedProgressLogger::always(Reply::Award(8)),
        )
    }

    pub fn deps(&self) -> PlayerDeps {
        PlayerDeps {
            resolver: Arc::new(ExerciseResolver::new(
                self.catalog.clone(),
                AudioUrlBuilder::new(Some(STORAGE.to_string()), "exercise-audio"),
            )),
            audio: self.audio.clone(),
            animation: self.animation.clone(),
            progress: self.progress.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }

    pub fn open(&self, request: SessionRequest) -> SessionHandle {
        spawn_session(self.deps(), request, self.locale_tx.subscribe())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ZoomiEvent> {
        self.events.subscribe()
    }
}

/// Wait (on the paused clock) for a snapshot matching `predicate`
pub async fn wait_until<F>(handle: &SessionHandle, predicate: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(3600), handle.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("session closed while waiting")
}

pub async fn wait_phase(handle: &SessionHandle, phase: PlaybackPhase) -> SessionSnapshot {
    wait_until(handle, |s| s.phase == phase).await
}

/// Everything currently buffered on `rx`
pub fn drain(rx: &mut broadcast::Receiver<ZoomiEvent>) -> Vec<ZoomiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn phases(events: &[ZoomiEvent]) -> Vec<PlaybackPhase> {
    events
        .iter()
        .filter_map(|e| match e {
            ZoomiEvent::PhaseChanged { new_phase, .. } => Some(*new_phase),
            _ => None,
        })
        .collect()
}
