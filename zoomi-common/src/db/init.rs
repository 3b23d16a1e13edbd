//! Database initialization
//!
//! Creates the catalog database on first run and brings the schema up to
//! date. All statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the catalog database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all catalog tables (idempotent)
///
/// Split out from [`init_database`] so in-memory pools used by tests get
/// the same schema.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_exercises_table(pool).await?;
    create_library_items_table(pool).await?;
    create_daily_plans_table(pool).await?;
    create_workout_items_table(pool).await?;
    Ok(())
}

async fn create_exercises_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exercises (
            id TEXT PRIMARY KEY,
            animation_id TEXT NOT NULL,
            icon_id TEXT,
            audio_path_en TEXT,
            audio_path_he TEXT,
            title_en TEXT NOT NULL,
            title_he TEXT NOT NULL,
            description_en TEXT,
            description_he TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_exercises_animation ON exercises(animation_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_library_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS library_items (
            id TEXT PRIMARY KEY,
            exercise_id TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
            category_name TEXT NOT NULL,
            category_color TEXT NOT NULL DEFAULT '#10B981',
            enable_audio INTEGER NOT NULL DEFAULT 1,
            enable_animation INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_daily_plans_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_plans (
            id TEXT PRIMARY KEY,
            track_level TEXT NOT NULL CHECK (track_level IN ('child', 'teen', 'adult')),
            day_number INTEGER NOT NULL,
            is_rest_day INTEGER NOT NULL DEFAULT 0,
            title TEXT NOT NULL,
            description TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_workout_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workout_items (
            id TEXT PRIMARY KEY,
            plan_id TEXT NOT NULL REFERENCES daily_plans(id) ON DELETE CASCADE,
            exercise_id TEXT NOT NULL REFERENCES exercises(id),
            sequence_order INTEGER NOT NULL,
            duration_seconds INTEGER,
            target_reps INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (plan_id, sequence_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
