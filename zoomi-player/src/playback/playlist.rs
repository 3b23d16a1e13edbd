//! Playlist queue
//!
//! Forward-only cursor over the entries of one workout. Entries are fetched
//! once; the cursor moves one step at a time and never wraps.

use crate::catalog::ExerciseCatalog;
use crate::error::{Error, ResolutionError};
use tracing::{error, info};
use uuid::Uuid;
use zoomi_common::models::PlaylistEntry;

/// Loading state of the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    Idle,
    Loading,
    Ready,
    Failed(ResolutionError),
}

#[derive(Debug)]
pub struct PlaylistQueue {
    plan_id: Uuid,
    status: QueueStatus,
    entries: Vec<PlaylistEntry>,
    index: usize,
}

impl PlaylistQueue {
    pub fn new(plan_id: Uuid) -> Self {
        Self {
            plan_id,
            status: QueueStatus::Idle,
            entries: Vec::new(),
            index: 0,
        }
    }

    pub fn status(&self) -> &QueueStatus {
        &self.status
    }

    /// Mark the fetch as started. Returns false if it already ran.
    pub fn begin_load(&mut self) -> bool {
        if self.status != QueueStatus::Idle {
            return false;
        }
        self.status = QueueStatus::Loading;
        true
    }

    /// Store the fetched entries and put the cursor on the first one
    pub fn apply(&mut self, result: std::result::Result<Vec<PlaylistEntry>, ResolutionError>) {
        match result {
            Ok(entries) => {
                info!(plan_id = %self.plan_id, count = entries.len(), "Workout loaded");
                self.entries = entries;
                self.index = 0;
                self.status = QueueStatus::Ready;
            }
            Err(e) => {
                self.entries.clear();
                self.index = 0;
                self.status = QueueStatus::Failed(e);
            }
        }
    }

    pub fn current_item(&self) -> Option<&PlaylistEntry> {
        self.entries.get(self.index)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_last_exercise(&self) -> bool {
        !self.entries.is_empty() && self.index + 1 >= self.entries.len()
    }

    /// Move to the next entry. Returns false, leaving the cursor unchanged,
    /// when already on the last entry.
    pub fn advance_to_next(&mut self) -> bool {
        if self.index + 1 < self.entries.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

/// Fetch the ordered entries of a workout for [`PlaylistQueue::apply`]
pub async fn fetch_workout(
    catalog: &dyn ExerciseCatalog,
    plan_id: Uuid,
) -> std::result::Result<Vec<PlaylistEntry>, ResolutionError> {
    match catalog.workout_entries(plan_id).await {
        Ok(entries) if entries.is_empty() => Err(ResolutionError::WorkoutEmpty),
        Ok(entries) => Ok(entries),
        Err(Error::NotFound(_)) => {
            error!(plan_id = %plan_id, "Workout not found");
            Err(ResolutionError::WorkoutUnavailable)
        }
        Err(e) => {
            error!(plan_id = %plan_id, "Failed to load workout items: {}", e);
            Err(ResolutionError::WorkoutUnavailable)
        }
    }
}
