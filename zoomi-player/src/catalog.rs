//! Exercise catalog collaborator
//!
//! The orchestrator reads exercises through [`ExerciseCatalog`] so it can run
//! against SQLite in the service and against in-memory fakes in tests.

use crate::db::catalog as queries;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;
use zoomi_common::models::{ExerciseDefinition, LibraryItem, PlaylistEntry};

/// Read access to exercises, library items and workouts
#[async_trait]
pub trait ExerciseCatalog: Send + Sync {
    /// Library item joined with its exercise, `None` when not found
    async fn library_item(&self, id: Uuid) -> Result<Option<LibraryItem>>;

    /// Raw exercise, `None` when not found
    async fn exercise(&self, id: Uuid) -> Result<Option<ExerciseDefinition>>;

    /// Ordered workout entries. An unknown plan yields `NotFound`.
    async fn workout_entries(&self, plan_id: Uuid) -> Result<Vec<PlaylistEntry>>;
}

/// [`ExerciseCatalog`] backed by the local SQLite catalog
#[derive(Clone)]
pub struct SqliteCatalog {
    db: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ExerciseCatalog for SqliteCatalog {
    async fn library_item(&self, id: Uuid) -> Result<Option<LibraryItem>> {
        queries::get_library_item(&self.db, id).await
    }

    async fn exercise(&self, id: Uuid) -> Result<Option<ExerciseDefinition>> {
        queries::get_exercise(&self.db, id).await
    }

    async fn workout_entries(&self, plan_id: Uuid) -> Result<Vec<PlaylistEntry>> {
        if !queries::plan_exists(&self.db, plan_id).await? {
            return Err(crate::error::Error::NotFound(format!("Workout {}", plan_id)));
        }
        queries::get_workout_entries(&self.db, plan_id).await
    }
}
