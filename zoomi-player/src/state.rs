//! Shared service state
//!
//! Holds the collaborators every session needs, the display locale and the
//! one session the host currently has open.

use crate::playback::{spawn_session, PlayerDeps, SessionHandle, SessionRequest};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::info;
use zoomi_common::events::ZoomiEvent;
use zoomi_common::Locale;

/// Shared state accessible by all request handlers
pub struct SharedState {
    deps: PlayerDeps,

    /// Display locale read at every resolution
    locale_tx: watch::Sender<Locale>,

    /// Session currently shown by the host (None before the first open)
    current: RwLock<Option<SessionHandle>>,
}

impl SharedState {
    pub fn new(deps: PlayerDeps) -> Self {
        let (locale_tx, _) = watch::channel(deps.config.locale);
        Self {
            deps,
            locale_tx,
            current: RwLock::new(None),
        }
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<ZoomiEvent> {
        self.deps.events.subscribe()
    }

    pub fn locale(&self) -> Locale {
        *self.locale_tx.borrow()
    }

    /// Change the display locale. Applies from the next resolution on.
    pub fn set_locale(&self, locale: Locale) {
        info!(%locale, "Display locale changed");
        self.locale_tx.send_replace(locale);
    }

    /// Open a new session, closing the current one first
    pub async fn open_session(&self, request: SessionRequest) -> SessionHandle {
        let mut current = self.current.write().await;
        if let Some(previous) = current.take() {
            // The previous session may already be closed; nothing to report then
            let _ = previous.exit().await;
        }

        let handle = spawn_session(self.deps.clone(), request, self.locale_tx.subscribe());
        *current = Some(handle.clone());
        handle
    }

    pub async fn current_session(&self) -> Option<SessionHandle> {
        self.current.read().await.clone()
    }
}
