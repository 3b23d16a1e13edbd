//! Media readiness gate
//!
//! Tracks whether the current exercise's narration is ready and owns the
//! loaded track. Every load carries a version; results and end signals from
//! a superseded version are discarded.
//!
//! Loading is fail-open: a failed load still reports ready, the exercise just
//! plays without narration and never reports a natural end.

use super::{AudioBackend, AudioTrack, EndSignal};
use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What to load for the next exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationRequest {
    pub url: Option<String>,
    pub enabled: bool,
}

impl NarrationRequest {
    pub fn disabled() -> Self {
        Self {
            url: None,
            enabled: false,
        }
    }
}

/// Result of [`ReadinessGate::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Nothing to load, ready now
    Ready,
    /// A load is in flight; wait for its [`LoadCompletion`]
    Pending,
}

/// Outcome of a background load, fed back through [`ReadinessGate::complete`]
pub struct LoadCompletion {
    version: u64,
    result: Result<Box<dyn AudioTrack>>,
}

impl std::fmt::Debug for LoadCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCompletion")
            .field("version", &self.version)
            .field("loaded", &self.result.is_ok())
            .finish()
    }
}

/// A loaded narration track scoped to one resolved exercise
///
/// Dropping it unloads the track.
pub struct Narration {
    track: Box<dyn AudioTrack>,
    end: EndSignal,
}

impl Narration {
    fn new(track: Box<dyn AudioTrack>, end: EndSignal) -> Self {
        Self { track, end }
    }

    /// Restart from zero and arm the end signal for this run
    pub fn play_from_start(&mut self) {
        self.end.arm();
        if let Err(e) = self.track.play_from_start() {
            self.end.disarm();
            warn!("Narration playback failed: {}", e);
        }
    }

    /// Halt and rewind without reporting an end
    pub fn reset(&mut self) {
        self.end.disarm();
        self.track.stop();
    }
}

impl Drop for Narration {
    fn drop(&mut self) {
        self.end.disarm();
        self.track.stop();
        self.track.unload();
    }
}

/// Readiness gate for narration media
pub struct ReadinessGate {
    backend: Arc<dyn AudioBackend>,
    current: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    pending_end: Option<EndSignal>,
    narration: Option<Narration>,
    ready: bool,
}

impl ReadinessGate {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            current: Arc::new(AtomicU64::new(0)),
            pending: None,
            pending_end: None,
            narration: None,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// True when a track is loaded and usable
    pub fn has_audio(&self) -> bool {
        self.narration.is_some()
    }

    /// Start loading narration for a new exercise.
    ///
    /// Any previous track or in-flight load is torn down first. `on_end` runs
    /// when the new track reaches its natural end; `on_loaded` receives the
    /// load result and must pass it back to [`ReadinessGate::complete`].
    pub fn load<E, L>(&mut self, request: NarrationRequest, on_end: E, on_loaded: L) -> GateStatus
    where
        E: Fn() + Send + Sync + 'static,
        L: FnOnce(LoadCompletion) + Send + 'static,
    {
        let version = self.release();

        let url = match request.url {
            Some(url) if request.enabled => url,
            _ => {
                self.ready = true;
                return GateStatus::Ready;
            }
        };

        let current = self.current.clone();
        let end = EndSignal::new(move || {
            if current.load(Ordering::SeqCst) == version {
                on_end();
            } else {
                debug!(version, "Discarding end signal from superseded narration");
            }
        });

        let backend = self.backend.clone();
        let load_end = end.clone();
        debug!(version, url = %url, "Loading narration");
        self.pending_end = Some(end);
        self.pending = Some(tokio::spawn(async move {
            let result = backend.load(&url, load_end).await;
            on_loaded(LoadCompletion { version, result });
        }));

        GateStatus::Pending
    }

    /// Apply a finished load. Returns false when the load was superseded and
    /// has been discarded.
    pub fn complete(&mut self, completion: LoadCompletion) -> bool {
        let LoadCompletion { version, result } = completion;

        if version != self.current.load(Ordering::SeqCst) {
            debug!(version, "Discarding superseded narration load");
            if let Ok(mut track) = result {
                track.unload();
            }
            return false;
        }

        self.pending = None;
        let end = self.pending_end.take();
        self.ready = true;

        match (result, end) {
            (Ok(track), Some(end)) => {
                self.narration = Some(Narration::new(track, end));
            }
            (Ok(mut track), None) => {
                track.unload();
            }
            (Err(e), _) => {
                warn!("Narration failed to load, continuing without audio: {}", e);
            }
        }
        true
    }

    /// Restart the narration from zero. No-op without a loaded track.
    pub fn play_audio(&mut self) {
        if let Some(narration) = self.narration.as_mut() {
            narration.play_from_start();
        }
    }

    /// Halt and rewind the narration. No-op without a loaded track.
    pub fn reset_audio(&mut self) {
        if let Some(narration) = self.narration.as_mut() {
            narration.reset();
        }
    }

    /// Tear down the current track and any in-flight load.
    ///
    /// Returns the version that is current afterwards.
    pub fn release(&mut self) -> u64 {
        let version = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        if let Some(end) = self.pending_end.take() {
            end.disarm();
        }
        self.narration = None;
        self.ready = false;
        version
    }
}

impl Drop for ReadinessGate {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Counters {
        plays: AtomicUsize,
        unloads: AtomicUsize,
    }

    struct TestTrack {
        counters: Arc<Counters>,
        end: EndSignal,
        ends: Arc<Mutex<Vec<EndSignal>>>,
    }

    impl AudioTrack for TestTrack {
        fn play_from_start(&mut self) -> Result<()> {
            self.counters.plays.fetch_add(1, Ordering::SeqCst);
            self.ends.lock().unwrap().push(self.end.clone());
            Ok(())
        }

        fn stop(&mut self) {}

        fn unload(&mut self) {
            self.counters.unloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TestBackend {
        latency: Duration,
        fail: bool,
        counters: Arc<Counters>,
        ends: Arc<Mutex<Vec<EndSignal>>>,
    }

    #[async_trait]
    impl AudioBackend for TestBackend {
        async fn load(&self, _url: &str, on_end: EndSignal) -> Result<Box<dyn AudioTrack>> {
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(Error::Media("404".to_string()));
            }
            Ok(Box::new(TestTrack {
                counters: self.counters.clone(),
                end: on_end,
                ends: self.ends.clone(),
            }))
        }
    }

    fn backend(latency_ms: u64, fail: bool) -> (Arc<TestBackend>, Arc<Counters>, Arc<Mutex<Vec<EndSignal>>>) {
        let counters = Arc::new(Counters::default());
        let ends = Arc::new(Mutex::new(Vec::new()));
        let backend = Arc::new(TestBackend {
            latency: Duration::from_millis(latency_ms),
            fail,
            counters: counters.clone(),
            ends: ends.clone(),
        });
        (backend, counters, ends)
    }

    fn request(url: &str) -> NarrationRequest {
        NarrationRequest {
            url: Some(url.to_string()),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_disabled_is_ready_immediately() {
        let (backend, counters, _) = backend(10, false);
        let mut gate = ReadinessGate::new(backend);

        let status = gate.load(NarrationRequest::disabled(), || {}, |_| {});
        assert_eq!(status, GateStatus::Ready);
        assert!(gate.is_ready());
        assert!(!gate.has_audio());

        let status = gate.load(
            NarrationRequest {
                url: None,
                enabled: true,
            },
            || {},
            |_| {},
        );
        assert_eq!(status, GateStatus::Ready);

        gate.play_audio();
        gate.reset_audio();
        assert_eq!(counters.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_then_play_fires_end_once() {
        let (backend, counters, ends) = backend(50, false);
        let mut gate = ReadinessGate::new(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let end_count = Arc::new(AtomicUsize::new(0));
        let end_counter = end_count.clone();

        let status = gate.load(
            request("https://cdn.test/a.mp3"),
            move || {
                end_counter.fetch_add(1, Ordering::SeqCst);
            },
            move |c| {
                let _ = tx.send(c);
            },
        );
        assert_eq!(status, GateStatus::Pending);
        assert!(!gate.is_ready());

        let completion = rx.recv().await.unwrap();
        assert!(gate.complete(completion));
        assert!(gate.is_ready());
        assert!(gate.has_audio());

        gate.play_audio();
        assert_eq!(counters.plays.load(Ordering::SeqCst), 1);

        let end = ends.lock().unwrap()[0].clone();
        assert!(end.fire());
        assert!(!end.fire());
        assert_eq!(end_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_is_fail_open() {
        let (backend, _, _) = backend(5, true);
        let mut gate = ReadinessGate::new(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();

        gate.load(request("https://cdn.test/missing.mp3"), || {}, move |c| {
            let _ = tx.send(c);
        });
        let completion = rx.recv().await.unwrap();

        assert!(gate.complete(completion));
        assert!(gate.is_ready());
        assert!(!gate.has_audio());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_completion_is_discarded() {
        let (backend, counters, _) = backend(100, false);
        let mut gate = ReadinessGate::new(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Capture the first completion manually so it arrives after the reload
        let stale_tx = tx.clone();
        gate.load(request("https://cdn.test/old.mp3"), || {}, move |c| {
            let _ = stale_tx.send(("old", c));
        });
        let version = gate.release();
        assert_eq!(version, 2);

        gate.load(request("https://cdn.test/new.mp3"), || {}, move |c| {
            let _ = tx.send(("new", c));
        });

        let (label, completion) = rx.recv().await.unwrap();
        assert_eq!(label, "new");
        assert!(gate.complete(completion));
        assert!(gate.has_audio());
        assert_eq!(counters.unloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_for_old_version_unloads_track() {
        let (backend, counters, _) = backend(0, false);
        let mut gate = ReadinessGate::new(backend.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        gate.load(request("https://cdn.test/old.mp3"), || {}, move |c| {
            let _ = tx.send(c);
        });
        let stale = rx.recv().await.unwrap();

        // Exercise changed before the result was applied
        gate.load(NarrationRequest::disabled(), || {}, |_| {});
        assert!(gate.is_ready());

        assert!(!gate.complete(stale));
        assert!(!gate.has_audio());
        assert_eq!(counters.unloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_from_released_track_is_ignored() {
        let (backend, _, ends) = backend(0, false);
        let mut gate = ReadinessGate::new(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let end_count = Arc::new(AtomicUsize::new(0));
        let end_counter = end_count.clone();

        gate.load(
            request("https://cdn.test/a.mp3"),
            move || {
                end_counter.fetch_add(1, Ordering::SeqCst);
            },
            move |c| {
                let _ = tx.send(c);
            },
        );
        let completion = rx.recv().await.unwrap();
        gate.complete(completion);
        gate.play_audio();

        let end = ends.lock().unwrap()[0].clone();
        gate.release();
        assert!(!end.fire());
        assert_eq!(end_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_disarms_end() {
        let (backend, _, ends) = backend(0, false);
        let mut gate = ReadinessGate::new(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();

        gate.load(request("https://cdn.test/a.mp3"), || {}, move |c| {
            let _ = tx.send(c);
        });
        let completion = rx.recv().await.unwrap();
        gate.complete(completion);

        gate.play_audio();
        gate.reset_audio();
        let end = ends.lock().unwrap()[0].clone();
        assert!(!end.fire());

        gate.play_audio();
        assert!(end.fire());
    }
}
