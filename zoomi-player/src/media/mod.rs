//! Media collaborators
//!
//! Narration audio and animation are driven from the orchestrator but
//! implemented behind traits so hosts can plug in real output devices.
//!
//! - [`ReadinessGate`] owns at most one loaded narration and reports when
//!   the current exercise may start.
//! - [`AnimationStage`] remounts the exercise animation on every start.
//! - [`HttpNarrationBackend`] is the headless narration backend used by the
//!   service binary.

pub mod animation;
pub mod gate;
pub mod http_backend;

pub use animation::{AnimationStage, AnimationSurface, MountedAnimation, TracingAnimationSurface};
pub use gate::{GateStatus, LoadCompletion, Narration, NarrationRequest, ReadinessGate};
pub use http_backend::{ClockedTrack, HttpNarrationBackend};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Natural-end notification handed to an [`AudioBackend`] on load
///
/// The signal only passes through while armed. Starting playback arms it,
/// stopping disarms it, and firing disarms it, so each playback run
/// reports its end at most once.
#[derive(Clone)]
pub struct EndSignal {
    armed: Arc<AtomicBool>,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl EndSignal {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            armed: Arc::new(AtomicBool::new(false)),
            callback: Arc::new(callback),
        }
    }

    /// Allow the next `fire` through
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Report natural end. Returns false when the signal was not armed.
    pub fn fire(&self) -> bool {
        if self.armed.swap(false, Ordering::SeqCst) {
            (self.callback)();
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for EndSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndSignal")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Loads narration assets
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Fetch and prepare the asset at `url`.
    ///
    /// The returned track must call `on_end.fire()` when playback reaches the
    /// end of the asset.
    async fn load(&self, url: &str, on_end: EndSignal) -> Result<Box<dyn AudioTrack>>;
}

/// A loaded narration asset
pub trait AudioTrack: Send + Sync {
    /// Seek to zero and play. Calling it while playing restarts.
    fn play_from_start(&mut self) -> Result<()>;

    /// Halt playback and rewind
    fn stop(&mut self);

    /// Release the asset. The track is not used again afterwards.
    fn unload(&mut self);
}
