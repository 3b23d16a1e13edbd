//! Countdown timer
//!
//! Whole-second countdown driven by a tokio interval. The tick task is
//! aborted on `pause`, `reset` and drop, so no callback runs after its owner
//! is gone.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

const TICK: Duration = Duration::from_secs(1);

type TickFn = Arc<dyn Fn(u32) + Send + Sync>;
type CompleteFn = Arc<dyn Fn() + Send + Sync>;

pub struct CountdownTimer {
    remaining: Arc<AtomicU32>,
    ticker: Option<JoinHandle<()>>,
    on_tick: TickFn,
    on_complete: CompleteFn,
}

impl CountdownTimer {
    /// `on_tick` receives the remaining seconds after each elapsed second,
    /// `on_complete` runs once when the countdown reaches zero.
    pub fn new<T, C>(seconds: u32, on_tick: T, on_complete: C) -> Self
    where
        T: Fn(u32) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Self {
            remaining: Arc::new(AtomicU32::new(seconds)),
            ticker: None,
            on_tick: Arc::new(on_tick),
            on_complete: Arc::new(on_complete),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Begin ticking down from the current remaining value.
    ///
    /// Restarts the tick phase if already running. A timer at zero completes
    /// on its first tick.
    pub fn start(&mut self) {
        self.stop_ticker();

        let remaining = self.remaining.clone();
        let on_tick = self.on_tick.clone();
        let on_complete = self.on_complete.clone();

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;

                let prev = remaining.load(Ordering::SeqCst);
                if prev <= 1 {
                    remaining.store(0, Ordering::SeqCst);
                    on_tick(0);
                    on_complete();
                    break;
                }

                remaining.store(prev - 1, Ordering::SeqCst);
                on_tick(prev - 1);
            }
        }));
    }

    /// Stop ticking, keep the remaining value
    pub fn pause(&mut self) {
        self.stop_ticker();
    }

    /// Stop ticking and set the remaining value
    pub fn reset(&mut self, seconds: u32) {
        self.stop_ticker();
        self.remaining.store(seconds, Ordering::SeqCst);
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
