//! Exercise resolver
//!
//! Turns any of the three ways of addressing an exercise into one
//! [`ResolvedExercise`] with locale-specific text and narration URL applied.

use crate::catalog::ExerciseCatalog;
use crate::config::BackendConfig;
use crate::error::ResolutionError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;
use zoomi_common::models::{ExerciseDefinition, LibraryItem, PlaylistEntry};
use zoomi_common::Locale;

/// How the session reaches its exercise(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExerciseAddress {
    LibraryItem { id: Uuid },
    Exercise { id: Uuid },
    Playlist { plan_id: Uuid },
}

impl ExerciseAddress {
    /// Pick the address from optional references.
    ///
    /// Exactly one reference must be set; none or several leave the session
    /// without an exercise.
    pub fn from_refs(
        library_item_id: Option<Uuid>,
        exercise_id: Option<Uuid>,
        plan_id: Option<Uuid>,
    ) -> Result<Self, ResolutionError> {
        match (plan_id, library_item_id, exercise_id) {
            (Some(plan_id), None, None) => Ok(ExerciseAddress::Playlist { plan_id }),
            (None, Some(id), None) => Ok(ExerciseAddress::LibraryItem { id }),
            (None, None, Some(id)) => Ok(ExerciseAddress::Exercise { id }),
            (None, None, None) => Err(ResolutionError::MissingReference),
            _ => {
                warn!("More than one exercise reference supplied");
                Err(ResolutionError::MissingReference)
            }
        }
    }
}

/// The exercise as it is actually played
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedExercise {
    pub exercise_id: Uuid,
    pub animation_id: String,
    pub icon_id: Option<String>,
    pub enable_audio: bool,
    pub enable_animation: bool,
    pub audio_url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub duration_seconds: Option<u32>,
    pub target_reps: Option<u32>,
}

/// Builds public narration URLs from storage paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUrlBuilder {
    storage_base_url: Option<String>,
    bucket: String,
}

impl AudioUrlBuilder {
    pub fn new(storage_base_url: Option<String>, bucket: impl Into<String>) -> Self {
        Self {
            storage_base_url: storage_base_url.map(|u| u.trim_end_matches('/').to_string()),
            bucket: bucket.into(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.storage_base_url.clone(), config.audio_bucket.clone())
    }

    /// Public URL for `path`. Absolute URLs pass through unchanged.
    pub fn public_url(&self, path: &str) -> Option<String> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }

        match &self.storage_base_url {
            Some(base) => Some(format!(
                "{}/storage/v1/object/public/{}/{}",
                base,
                self.bucket,
                path.trim_start_matches('/')
            )),
            None => {
                warn!(path, "No storage base URL configured, narration disabled");
                None
            }
        }
    }

    fn for_locale(&self, exercise: &ExerciseDefinition, locale: Locale) -> Option<String> {
        exercise
            .audio_path
            .get(locale)
            .as_deref()
            .and_then(|path| self.public_url(path))
    }
}

pub struct ExerciseResolver {
    catalog: Arc<dyn ExerciseCatalog>,
    urls: AudioUrlBuilder,
}

impl ExerciseResolver {
    pub fn new(catalog: Arc<dyn ExerciseCatalog>, urls: AudioUrlBuilder) -> Self {
        Self { catalog, urls }
    }

    pub fn catalog(&self) -> &Arc<dyn ExerciseCatalog> {
        &self.catalog
    }

    /// Look up a library item and resolve it
    pub async fn resolve_library_item(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<ResolvedExercise, ResolutionError> {
        match self.catalog.library_item(id).await {
            Ok(Some(item)) => Ok(self.from_library_item(&item, locale)),
            Ok(None) => Err(ResolutionError::ExerciseNotFound),
            Err(e) => {
                error!(library_item_id = %id, "Failed to load library item: {}", e);
                Err(ResolutionError::Backend)
            }
        }
    }

    /// Look up a raw exercise and resolve it. Hidden exercises are rejected.
    pub async fn resolve_exercise(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<ResolvedExercise, ResolutionError> {
        match self.catalog.exercise(id).await {
            Ok(Some(exercise)) if exercise.is_active() => Ok(self.from_exercise(&exercise, locale)),
            Ok(Some(_)) => Err(ResolutionError::Unavailable),
            Ok(None) => Err(ResolutionError::ExerciseNotFound),
            Err(e) => {
                error!(exercise_id = %id, "Failed to load exercise: {}", e);
                Err(ResolutionError::Backend)
            }
        }
    }

    pub fn from_library_item(&self, item: &LibraryItem, locale: Locale) -> ResolvedExercise {
        let exercise = &item.exercise;
        let audio_url = if item.enable_audio {
            self.urls.for_locale(exercise, locale)
        } else {
            None
        };

        ResolvedExercise {
            enable_audio: item.enable_audio,
            enable_animation: item.enable_animation,
            audio_url,
            ..base(exercise, locale)
        }
    }

    pub fn from_exercise(&self, exercise: &ExerciseDefinition, locale: Locale) -> ResolvedExercise {
        ResolvedExercise {
            enable_audio: exercise.audio_enabled(),
            audio_url: self.urls.for_locale(exercise, locale),
            ..base(exercise, locale)
        }
    }

    pub fn from_playlist_entry(&self, entry: &PlaylistEntry, locale: Locale) -> ResolvedExercise {
        let exercise = &entry.exercise;
        ResolvedExercise {
            enable_audio: exercise.audio_enabled(),
            audio_url: self.urls.for_locale(exercise, locale),
            duration_seconds: entry.completion.duration_seconds(),
            target_reps: entry.completion.target_reps(),
            ..base(exercise, locale)
        }
    }
}

fn base(exercise: &ExerciseDefinition, locale: Locale) -> ResolvedExercise {
    ResolvedExercise {
        exercise_id: exercise.id,
        animation_id: exercise.animation_id.clone(),
        icon_id: exercise.icon_id.clone(),
        enable_audio: false,
        enable_animation: true,
        audio_url: None,
        title: exercise.title.pick(locale),
        description: exercise.description.pick(locale),
        duration_seconds: None,
        target_reps: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use zoomi_common::models::{EntryCompletion, ExerciseStatus};
    use zoomi_common::Localized;

    #[derive(Default)]
    struct MapCatalog {
        exercises: HashMap<Uuid, ExerciseDefinition>,
        items: HashMap<Uuid, LibraryItem>,
        broken: bool,
    }

    #[async_trait]
    impl ExerciseCatalog for MapCatalog {
        async fn library_item(&self, id: Uuid) -> Result<Option<LibraryItem>> {
            if self.broken {
                return Err(Error::Internal("db down".to_string()));
            }
            Ok(self.items.get(&id).cloned())
        }

        async fn exercise(&self, id: Uuid) -> Result<Option<ExerciseDefinition>> {
            if self.broken {
                return Err(Error::Internal("db down".to_string()));
            }
            Ok(self.exercises.get(&id).cloned())
        }

        async fn workout_entries(&self, _plan_id: Uuid) -> Result<Vec<PlaylistEntry>> {
            Ok(Vec::new())
        }
    }

    fn exercise(status: ExerciseStatus, audio: bool) -> ExerciseDefinition {
        ExerciseDefinition {
            id: Uuid::new_v4(),
            animation_id: "arm-circles".to_string(),
            icon_id: Some("circle".to_string()),
            title: Localized::new("Arm Circles".to_string(), "סיבובי ידיים".to_string()),
            description: Localized::new(Some("Rotate slowly".to_string()), None),
            audio_path: if audio {
                Localized::new(Some("en/arm.mp3".to_string()), Some("he/arm.mp3".to_string()))
            } else {
                Localized::new(None, None)
            },
            status,
        }
    }

    fn urls() -> AudioUrlBuilder {
        AudioUrlBuilder::new(Some("https://store.test/".to_string()), "exercise-audio")
    }

    fn resolver(catalog: MapCatalog) -> ExerciseResolver {
        ExerciseResolver::new(Arc::new(catalog), urls())
    }

    #[test]
    fn test_address_requires_exactly_one_reference() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            ExerciseAddress::from_refs(None, None, Some(b)),
            Ok(ExerciseAddress::Playlist { plan_id: b })
        );
        assert_eq!(
            ExerciseAddress::from_refs(Some(a), None, None),
            Ok(ExerciseAddress::LibraryItem { id: a })
        );
        assert_eq!(
            ExerciseAddress::from_refs(None, Some(a), None),
            Ok(ExerciseAddress::Exercise { id: a })
        );
        assert_eq!(
            ExerciseAddress::from_refs(None, None, None),
            Err(ResolutionError::MissingReference)
        );
        assert_eq!(
            ExerciseAddress::from_refs(Some(a), Some(b), None),
            Err(ResolutionError::MissingReference)
        );
        assert_eq!(
            ExerciseAddress::from_refs(Some(a), None, Some(b)),
            Err(ResolutionError::MissingReference)
        );
    }

    #[test]
    fn test_public_url() {
        let urls = urls();
        assert_eq!(
            urls.public_url("he/arm.mp3").as_deref(),
            Some("https://store.test/storage/v1/object/public/exercise-audio/he/arm.mp3")
        );
        assert_eq!(
            urls.public_url("https://cdn.test/x.mp3").as_deref(),
            Some("https://cdn.test/x.mp3")
        );
        assert_eq!(AudioUrlBuilder::new(None, "b").public_url("x.mp3"), None);
    }

    #[tokio::test]
    async fn test_library_item_uses_item_flags() {
        let ex = exercise(ExerciseStatus::Active, true);
        let item = LibraryItem {
            id: Uuid::new_v4(),
            exercise: ex.clone(),
            category_name: "Warmup".to_string(),
            category_color: "#10B981".to_string(),
            enable_audio: false,
            enable_animation: false,
            sort_order: 1,
        };
        let item_id = item.id;
        let mut catalog = MapCatalog::default();
        catalog.items.insert(item_id, item);

        let resolved = resolver(catalog)
            .resolve_library_item(item_id, Locale::He)
            .await
            .unwrap();
        assert_eq!(resolved.exercise_id, ex.id);
        assert_eq!(resolved.title, "סיבובי ידיים");
        assert_eq!(resolved.description, None);
        assert!(!resolved.enable_audio);
        assert!(!resolved.enable_animation);
        assert_eq!(resolved.audio_url, None);
    }

    #[tokio::test]
    async fn test_exercise_locale_and_audio() {
        let ex = exercise(ExerciseStatus::Active, true);
        let id = ex.id;
        let mut catalog = MapCatalog::default();
        catalog.exercises.insert(id, ex);

        let resolved = resolver(catalog).resolve_exercise(id, Locale::En).await.unwrap();
        assert_eq!(resolved.title, "Arm Circles");
        assert_eq!(resolved.description.as_deref(), Some("Rotate slowly"));
        assert!(resolved.enable_audio);
        assert!(resolved.enable_animation);
        assert_eq!(
            resolved.audio_url.as_deref(),
            Some("https://store.test/storage/v1/object/public/exercise-audio/en/arm.mp3")
        );
    }

    #[tokio::test]
    async fn test_hidden_exercise_is_unavailable() {
        let ex = exercise(ExerciseStatus::Hidden, false);
        let id = ex.id;
        let mut catalog = MapCatalog::default();
        catalog.exercises.insert(id, ex);

        let result = resolver(catalog).resolve_exercise(id, Locale::En).await;
        assert_eq!(result, Err(ResolutionError::Unavailable));
    }

    #[tokio::test]
    async fn test_missing_and_backend_errors() {
        let result = resolver(MapCatalog::default())
            .resolve_exercise(Uuid::new_v4(), Locale::En)
            .await;
        assert_eq!(result, Err(ResolutionError::ExerciseNotFound));

        let broken = MapCatalog {
            broken: true,
            ..Default::default()
        };
        let result = resolver(broken)
            .resolve_library_item(Uuid::new_v4(), Locale::En)
            .await;
        assert_eq!(result, Err(ResolutionError::Backend));
    }

    #[test]
    fn test_playlist_entry_copies_completion() {
        let ex = exercise(ExerciseStatus::Active, false);
        let entry = PlaylistEntry {
            workout_item_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            exercise: ex,
            sequence_order: 0,
            completion: EntryCompletion::Reps { target: 12 },
        };

        let resolved = resolver(MapCatalog::default()).from_playlist_entry(&entry, Locale::En);
        assert_eq!(resolved.target_reps, Some(12));
        assert_eq!(resolved.duration_seconds, None);
        assert!(!resolved.enable_audio);
        assert!(resolved.enable_animation);
    }
}
