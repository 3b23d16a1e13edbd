//! Completion strategies
//!
//! Exactly one strategy decides when a playing exercise is finished. It is
//! chosen once when playback starts and owns whatever it needs to run (a
//! countdown or a delay task); dropping the armed strategy disarms it.

use super::resolver::ResolvedExercise;
use super::timer::CountdownTimer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use zoomi_common::events::FinishCause;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionStrategy {
    /// Countdown of the entry's duration
    Timer { seconds: u32 },
    /// Explicit "I'm done" from the user; `target` is shown when known
    RepPrompt { target: Option<u32> },
    /// Natural end of the narration
    AudioEnd,
    /// Constant delay for a single exercise with nothing else to wait on
    FixedDelay { delay_ms: u64 },
}

impl CompletionStrategy {
    /// Pick the strategy for `exercise`.
    ///
    /// Inside a playlist a duration beats a rep target, which beats
    /// narration. Outside a playlist only narration or the fixed delay apply.
    /// `has_audio` is true only when narration actually loaded.
    pub fn choose(
        exercise: &ResolvedExercise,
        in_playlist: bool,
        has_audio: bool,
        fixed_delay: Duration,
    ) -> Self {
        let duration = exercise.duration_seconds.filter(|s| *s > 0);
        let reps = exercise.target_reps.filter(|r| *r > 0);

        match (in_playlist, duration, reps) {
            (true, Some(seconds), _) => CompletionStrategy::Timer { seconds },
            (true, None, Some(target)) => CompletionStrategy::RepPrompt {
                target: Some(target),
            },
            _ if exercise.enable_audio && has_audio => CompletionStrategy::AudioEnd,
            (false, _, _) => CompletionStrategy::FixedDelay {
                delay_ms: fixed_delay.as_millis() as u64,
            },
            (true, None, None) => CompletionStrategy::RepPrompt { target: None },
        }
    }
}

enum Guard {
    Countdown(CountdownTimer),
    Delay(JoinHandle<()>),
    External,
}

/// A strategy that is currently armed
pub struct ArmedStrategy {
    strategy: CompletionStrategy,
    guard: Guard,
}

impl ArmedStrategy {
    /// Arm `strategy`.
    ///
    /// Timer and fixed-delay strategies call `on_finish` themselves; the
    /// other two are finished from outside (user input, narration end).
    pub fn arm<T, F>(strategy: CompletionStrategy, on_tick: T, on_finish: F) -> Self
    where
        T: Fn(u32) + Send + Sync + 'static,
        F: Fn(FinishCause) + Send + Sync + 'static,
    {
        let on_finish = Arc::new(on_finish);

        let guard = match strategy {
            CompletionStrategy::Timer { seconds } => {
                let finish = on_finish.clone();
                let mut timer = CountdownTimer::new(seconds, on_tick, move || {
                    finish(FinishCause::TimerElapsed)
                });
                timer.start();
                Guard::Countdown(timer)
            }
            CompletionStrategy::FixedDelay { delay_ms } => {
                let finish = on_finish.clone();
                Guard::Delay(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    finish(FinishCause::FixedDelayElapsed);
                }))
            }
            CompletionStrategy::RepPrompt { .. } | CompletionStrategy::AudioEnd => Guard::External,
        };

        Self { strategy, guard }
    }

    pub fn strategy(&self) -> CompletionStrategy {
        self.strategy
    }

    /// Seconds left on a countdown strategy
    pub fn remaining(&self) -> Option<u32> {
        match &self.guard {
            Guard::Countdown(timer) => Some(timer.remaining()),
            _ => None,
        }
    }
}

impl Drop for ArmedStrategy {
    fn drop(&mut self) {
        if let Guard::Delay(handle) = &self.guard {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    const DELAY: Duration = Duration::from_secs(10);

    fn exercise(audio: bool, duration: Option<u32>, reps: Option<u32>) -> ResolvedExercise {
        ResolvedExercise {
            exercise_id: Uuid::new_v4(),
            animation_id: "squats".to_string(),
            icon_id: None,
            enable_audio: audio,
            enable_animation: true,
            audio_url: audio.then(|| "https://cdn.test/squats.mp3".to_string()),
            title: "Squats".to_string(),
            description: None,
            duration_seconds: duration,
            target_reps: reps,
        }
    }

    #[test]
    fn test_precedence_in_playlist() {
        let ex = exercise(true, Some(30), Some(12));
        assert_eq!(
            CompletionStrategy::choose(&ex, true, true, DELAY),
            CompletionStrategy::Timer { seconds: 30 }
        );

        let ex = exercise(true, None, Some(12));
        assert_eq!(
            CompletionStrategy::choose(&ex, true, true, DELAY),
            CompletionStrategy::RepPrompt { target: Some(12) }
        );

        let ex = exercise(true, None, None);
        assert_eq!(
            CompletionStrategy::choose(&ex, true, true, DELAY),
            CompletionStrategy::AudioEnd
        );

        let ex = exercise(false, None, None);
        assert_eq!(
            CompletionStrategy::choose(&ex, true, false, DELAY),
            CompletionStrategy::RepPrompt { target: None }
        );
    }

    #[test]
    fn test_single_exercise_ignores_duration() {
        let ex = exercise(false, Some(30), None);
        assert_eq!(
            CompletionStrategy::choose(&ex, false, false, DELAY),
            CompletionStrategy::FixedDelay { delay_ms: 10_000 }
        );

        let ex = exercise(true, None, None);
        assert_eq!(
            CompletionStrategy::choose(&ex, false, true, DELAY),
            CompletionStrategy::AudioEnd
        );
    }

    #[test]
    fn test_failed_narration_falls_back_to_delay() {
        let ex = exercise(true, None, None);
        assert_eq!(
            CompletionStrategy::choose(&ex, false, false, DELAY),
            CompletionStrategy::FixedDelay { delay_ms: 10_000 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_strategy_finishes_with_ticks() {
        let causes = Arc::new(Mutex::new(Vec::new()));
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let c = causes.clone();
        let t = ticks.clone();

        let armed = ArmedStrategy::arm(
            CompletionStrategy::Timer { seconds: 2 },
            move |s| t.lock().unwrap().push(s),
            move |cause| c.lock().unwrap().push(cause),
        );
        assert_eq!(armed.remaining(), Some(2));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![1, 0]);
        assert_eq!(*causes.lock().unwrap(), vec![FinishCause::TimerElapsed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_disarms_fixed_delay() {
        let causes = Arc::new(Mutex::new(Vec::new()));
        let c = causes.clone();

        let armed = ArmedStrategy::arm(
            CompletionStrategy::FixedDelay { delay_ms: 1000 },
            |_| {},
            move |cause| c.lock().unwrap().push(cause),
        );
        drop(armed);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(causes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_strategies_never_self_finish() {
        let causes = Arc::new(Mutex::new(Vec::new()));
        let c = causes.clone();

        let armed = ArmedStrategy::arm(
            CompletionStrategy::RepPrompt { target: Some(12) },
            |_| {},
            move |cause| c.lock().unwrap().push(cause),
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(causes.lock().unwrap().is_empty());
        assert_eq!(armed.remaining(), None);
    }
}
