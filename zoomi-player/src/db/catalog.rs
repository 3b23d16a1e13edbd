//! Catalog database queries
//!
//! Read exercises, library items and workout entries from the SQLite
//! catalog. Rows are converted into `zoomi_common::models` types here so
//! nothing above this module sees raw columns.

use crate::error::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;
use zoomi_common::models::{
    EntryCompletion, ExerciseDefinition, ExerciseStatus, LibraryItem, PlaylistEntry,
};
use zoomi_common::Localized;

const EXERCISE_COLUMNS: &str = r#"
    e.id AS exercise_id, e.animation_id, e.icon_id,
    e.audio_path_en, e.audio_path_he,
    e.title_en, e.title_he,
    e.description_en, e.description_he,
    e.status
"#;

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Invalid {} UUID: {}", what, e)))
}

fn exercise_from_row(row: &SqliteRow) -> Result<ExerciseDefinition> {
    let id: String = row.get("exercise_id");
    let status: String = row.get("status");

    Ok(ExerciseDefinition {
        id: parse_uuid(&id, "exercise")?,
        animation_id: row.get("animation_id"),
        icon_id: row.get("icon_id"),
        title: Localized::new(row.get("title_en"), row.get("title_he")),
        description: Localized::new(row.get("description_en"), row.get("description_he")),
        audio_path: Localized::new(row.get("audio_path_en"), row.get("audio_path_he")),
        status: ExerciseStatus::from_column(&status),
    })
}

/// Get a single exercise by ID
pub async fn get_exercise(db: &Pool<Sqlite>, exercise_id: Uuid) -> Result<Option<ExerciseDefinition>> {
    let sql = format!("SELECT {} FROM exercises e WHERE e.id = ?", EXERCISE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(exercise_id.to_string())
        .fetch_optional(db)
        .await?;

    row.as_ref().map(exercise_from_row).transpose()
}

/// Get a library item joined with its exercise
pub async fn get_library_item(db: &Pool<Sqlite>, library_item_id: Uuid) -> Result<Option<LibraryItem>> {
    let sql = format!(
        r#"
        SELECT li.id AS library_item_id, li.category_name, li.category_color,
               li.enable_audio, li.enable_animation, li.sort_order,
               {}
        FROM library_items li
        JOIN exercises e ON li.exercise_id = e.id
        WHERE li.id = ?
        "#,
        EXERCISE_COLUMNS
    );

    let Some(row) = sqlx::query(&sql)
        .bind(library_item_id.to_string())
        .fetch_optional(db)
        .await?
    else {
        return Ok(None);
    };

    let id: String = row.get("library_item_id");
    Ok(Some(LibraryItem {
        id: parse_uuid(&id, "library item")?,
        exercise: exercise_from_row(&row)?,
        category_name: row.get("category_name"),
        category_color: row.get("category_color"),
        enable_audio: row.get("enable_audio"),
        enable_animation: row.get("enable_animation"),
        sort_order: row.get("sort_order"),
    }))
}

/// Get the entries of a workout ordered by `sequence_order`
pub async fn get_workout_entries(db: &Pool<Sqlite>, plan_id: Uuid) -> Result<Vec<PlaylistEntry>> {
    let sql = format!(
        r#"
        SELECT wi.id AS workout_item_id, wi.plan_id, wi.sequence_order,
               wi.duration_seconds, wi.target_reps,
               {}
        FROM workout_items wi
        JOIN exercises e ON wi.exercise_id = e.id
        WHERE wi.plan_id = ?
        ORDER BY wi.sequence_order ASC
        "#,
        EXERCISE_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(plan_id.to_string())
        .fetch_all(db)
        .await?;

    rows.iter()
        .map(|row| {
            let workout_item_id: String = row.get("workout_item_id");
            let plan: String = row.get("plan_id");
            Ok(PlaylistEntry {
                workout_item_id: parse_uuid(&workout_item_id, "workout item")?,
                plan_id: parse_uuid(&plan, "plan")?,
                exercise: exercise_from_row(row)?,
                sequence_order: row.get("sequence_order"),
                completion: EntryCompletion::from_columns(
                    row.get("duration_seconds"),
                    row.get("target_reps"),
                ),
            })
        })
        .collect()
}

/// True when a daily plan row exists
pub async fn plan_exists(db: &Pool<Sqlite>, plan_id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_plans WHERE id = ?")
        .bind(plan_id.to_string())
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}
