//! Catalog models
//!
//! Read-only views of the exercise catalog. Rows are authored elsewhere;
//! the player only consumes them.

use crate::locale::Localized;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Publication status of a catalog exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStatus {
    Active,
    Hidden,
}

impl ExerciseStatus {
    /// Parse the `status` column. Unknown values are treated as hidden.
    pub fn from_column(value: &str) -> Self {
        match value {
            "active" => ExerciseStatus::Active,
            _ => ExerciseStatus::Hidden,
        }
    }
}

/// Catalog exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub id: Uuid,
    /// Opaque key into the animation registry of the host
    pub animation_id: String,
    pub icon_id: Option<String>,
    pub title: Localized<String>,
    pub description: Localized<Option<String>>,
    /// Storage paths of the narration asset, per locale
    pub audio_path: Localized<Option<String>>,
    pub status: ExerciseStatus,
}

impl ExerciseDefinition {
    /// Narration exists for at least one locale
    pub fn audio_enabled(&self) -> bool {
        self.audio_path.any()
    }

    pub fn is_active(&self) -> bool {
        self.status == ExerciseStatus::Active
    }
}

/// Library row: how an exercise is presented when opened from the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: Uuid,
    pub exercise: ExerciseDefinition,
    pub category_name: String,
    pub category_color: String,
    pub enable_audio: bool,
    pub enable_animation: bool,
    pub sort_order: i64,
}

/// How a workout entry is considered complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryCompletion {
    /// Countdown of `seconds`
    Timed { seconds: u32 },
    /// User confirms `target` repetitions
    Reps { target: u32 },
    /// Neither set: narration or an explicit confirmation ends the entry
    Manual,
}

impl EntryCompletion {
    /// Build from the nullable `duration_seconds` / `target_reps` columns.
    ///
    /// Non-positive values count as absent. When both are present the
    /// duration wins.
    pub fn from_columns(duration_seconds: Option<i64>, target_reps: Option<i64>) -> Self {
        let duration = duration_seconds.filter(|v| *v > 0);
        let reps = target_reps.filter(|v| *v > 0);

        match (duration, reps) {
            (Some(seconds), Some(target)) => {
                warn!(
                    duration_seconds = seconds,
                    target_reps = target,
                    "Workout entry sets both duration and reps; using duration"
                );
                EntryCompletion::Timed {
                    seconds: clamp_u32(seconds),
                }
            }
            (Some(seconds), None) => EntryCompletion::Timed {
                seconds: clamp_u32(seconds),
            },
            (None, Some(target)) => EntryCompletion::Reps {
                target: clamp_u32(target),
            },
            (None, None) => EntryCompletion::Manual,
        }
    }

    pub fn duration_seconds(&self) -> Option<u32> {
        match self {
            EntryCompletion::Timed { seconds } => Some(*seconds),
            _ => None,
        }
    }

    pub fn target_reps(&self) -> Option<u32> {
        match self {
            EntryCompletion::Reps { target } => Some(*target),
            _ => None,
        }
    }
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// One row of a workout, joined with its exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub workout_item_id: Uuid,
    pub plan_id: Uuid,
    pub exercise: ExerciseDefinition,
    /// Traversal order within the workout
    pub sequence_order: i64,
    pub completion: EntryCompletion,
}
