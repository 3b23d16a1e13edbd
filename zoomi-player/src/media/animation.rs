//! Exercise animation staging
//!
//! Animations are opaque to the player: it only mounts and unmounts them by
//! animation id. Every start uses a fresh mount key so the host builds a new
//! animation instance instead of resuming the previous one.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Host-side animation renderer
pub trait AnimationSurface: Send + Sync {
    fn mount(&self, animation_id: &str, key: u64);
    fn unmount(&self, key: u64);
}

/// Currently mounted animation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedAnimation {
    pub animation_id: String,
    pub key: u64,
}

/// Owns the mounted animation for one session
pub struct AnimationStage {
    surface: Arc<dyn AnimationSurface>,
    next_key: u64,
    mounted: Option<MountedAnimation>,
}

impl AnimationStage {
    pub fn new(surface: Arc<dyn AnimationSurface>) -> Self {
        Self {
            surface,
            next_key: 1,
            mounted: None,
        }
    }

    /// Mount `animation_id` under a new key, replacing whatever was mounted
    pub fn start(&mut self, animation_id: &str) -> u64 {
        self.stop();

        let key = self.next_key;
        self.next_key += 1;
        self.surface.mount(animation_id, key);
        self.mounted = Some(MountedAnimation {
            animation_id: animation_id.to_string(),
            key,
        });
        key
    }

    pub fn stop(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            self.surface.unmount(mounted.key);
        }
    }

    pub fn current(&self) -> Option<&MountedAnimation> {
        self.mounted.as_ref()
    }
}

impl Drop for AnimationStage {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Animation surface that only logs, used by the headless service
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnimationSurface;

impl AnimationSurface for TracingAnimationSurface {
    fn mount(&self, animation_id: &str, key: u64) {
        info!(animation_id, key, "Animation mounted");
    }

    fn unmount(&self, key: u64) {
        info!(key, "Animation unmounted");
    }
}
