//! Host-facing display helpers
//!
//! The host renders one control at a time; [`ControlSurface`] names it and
//! carries the text it needs.

use super::strategy::CompletionStrategy;
use serde::Serialize;
use zoomi_common::events::PlaybackPhase;

/// The single control the host should render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum ControlSurface {
    /// Loading spinner ("Preparing exercise...")
    Preparing,
    /// Start button
    Start,
    /// Countdown display
    Countdown {
        display: String,
        seconds_remaining: u32,
        progress: f64,
    },
    /// Rep prompt with an "I'm Done" action
    RepPrompt { label: String, action: String },
    /// Exercise is playing with nothing to press
    Playing,
    /// Completion log outstanding
    Saving,
    /// Non-interactive screen between playlist entries
    Transitioning,
    /// Replay button (single exercise, completed)
    Replay,
    /// Completion summary awaiting dismissal
    Summary { label: String, total_points: u32 },
    /// Blocking message with a "go back" action
    Error { message: String },
}

/// Inputs needed to pick a control
pub struct SurfaceInputs<'a> {
    pub phase: PlaybackPhase,
    pub strategy: Option<CompletionStrategy>,
    pub seconds_remaining: Option<u32>,
    pub log_outstanding: bool,
    pub in_playlist: bool,
    pub summary_dismissed: bool,
    pub total_points: u32,
    pub error: Option<&'a str>,
}

impl ControlSurface {
    pub fn for_state(inputs: &SurfaceInputs<'_>) -> Self {
        if inputs.log_outstanding {
            return ControlSurface::Saving;
        }

        match inputs.phase {
            PlaybackPhase::Loading => ControlSurface::Preparing,
            PlaybackPhase::Ready => ControlSurface::Start,
            PlaybackPhase::Playing => match inputs.strategy {
                Some(CompletionStrategy::Timer { seconds }) => {
                    let remaining = inputs.seconds_remaining.unwrap_or(seconds);
                    ControlSurface::Countdown {
                        display: format_time(remaining),
                        seconds_remaining: remaining,
                        progress: countdown_progress(remaining, seconds),
                    }
                }
                Some(CompletionStrategy::RepPrompt { target }) => ControlSurface::RepPrompt {
                    label: rep_label(target),
                    action: "I'm Done".to_string(),
                },
                _ => ControlSurface::Playing,
            },
            PlaybackPhase::Finishing => ControlSurface::Saving,
            PlaybackPhase::Transitioning => ControlSurface::Transitioning,
            PlaybackPhase::Completed => {
                if inputs.summary_dismissed && !inputs.in_playlist {
                    ControlSurface::Replay
                } else {
                    ControlSurface::Summary {
                        label: points_label(inputs.total_points),
                        total_points: inputs.total_points,
                    }
                }
            }
            PlaybackPhase::Error => ControlSurface::Error {
                message: inputs.error.unwrap_or("Exercise not available").to_string(),
            },
        }
    }
}

/// `mm:ss`
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Elapsed fraction of a countdown, 0 when `total` is 0
pub fn countdown_progress(remaining: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    1.0 - f64::from(remaining.min(total)) / f64::from(total)
}

pub fn rep_label(target: Option<u32>) -> String {
    match target {
        Some(n) => format!("Do {} Reps", n),
        None => "Tap when done".to_string(),
    }
}

pub fn points_label(points: u32) -> String {
    format!("+{}", points)
}

/// Playlist position for the progress bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistProgress {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub fraction: f64,
}

impl PlaylistProgress {
    pub fn new(index: usize, total: usize) -> Self {
        let fraction = if total == 0 {
            0.0
        } else {
            (index + 1) as f64 / total as f64
        };
        Self {
            index,
            total,
            label: format!("Exercise {} of {}", index + 1, total),
            fraction,
        }
    }
}
