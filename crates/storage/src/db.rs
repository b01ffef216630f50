use chrono::{DateTime, Utc};
use meallog_core::{EnergySource, EntrySource, MealEntry};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Corrupt meal log row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meal_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            logged_at TEXT NOT NULL,
            food_name TEXT NOT NULL,
            protein_g REAL NOT NULL CHECK (protein_g >= 0),
            fat_g REAL NOT NULL CHECK (fat_g >= 0),
            carbs_g REAL NOT NULL CHECK (carbs_g >= 0),
            calories REAL NOT NULL CHECK (calories >= 0),
            note TEXT,
            source TEXT NOT NULL,
            energy_source TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meal_entries_logged_at ON meal_entries (logged_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Append one meal to the log and return its row id.
pub async fn append_meal_entry(pool: &DbPool, entry: &MealEntry) -> Result<i64, StorageError> {
    let result = sqlx::query(
        "INSERT INTO meal_entries (logged_at, food_name, protein_g, fat_g, carbs_g, calories, note, source, energy_source) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.logged_at)
    .bind(&entry.food_name)
    .bind(entry.protein_g)
    .bind(entry.fat_g)
    .bind(entry.carbs_g)
    .bind(entry.calories)
    .bind(entry.note.as_deref())
    .bind(entry.source.to_string())
    .bind(entry.energy_source.to_string())
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    info!(id, food = %entry.food_name, calories = entry.calories, source = %entry.source, "meal logged");
    Ok(id)
}

type MealRow = (i64, DateTime<Utc>, String, f64, f64, f64, f64, Option<String>, String, String);

const SELECT_MEALS: &str = "SELECT id, logged_at, food_name, protein_g, fat_g, carbs_g, calories, note, source, energy_source FROM meal_entries";

/// Most recent entries first.
pub async fn get_recent_meal_entries(pool: &DbPool, limit: u32) -> Result<Vec<MealEntry>, StorageError> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        "{SELECT_MEALS} ORDER BY logged_at DESC, id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_entry).collect()
}

/// The whole log, oldest first.
pub async fn get_all_meal_entries(pool: &DbPool) -> Result<Vec<MealEntry>, StorageError> {
    let rows = sqlx::query_as::<_, MealRow>(&format!("{SELECT_MEALS} ORDER BY logged_at, id"))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(row_to_entry).collect()
}

/// Entries with `start <= logged_at < end`, oldest first.
pub async fn get_meal_entries_between(
    pool: &DbPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<MealEntry>, StorageError> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        "{SELECT_MEALS} WHERE logged_at >= ? AND logged_at < ? ORDER BY logged_at, id"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_entry).collect()
}

fn row_to_entry(r: MealRow) -> Result<MealEntry, StorageError> {
    let id = r.0;
    let source = EntrySource::from_str(&r.8).map_err(|reason| StorageError::CorruptRow { id, reason })?;
    let energy_source =
        EnergySource::from_str(&r.9).map_err(|reason| StorageError::CorruptRow { id, reason })?;

    Ok(MealEntry {
        id: Some(id),
        logged_at: r.1,
        food_name: r.2,
        protein_g: r.3,
        fat_g: r.4,
        carbs_g: r.5,
        calories: r.6,
        note: r.7,
        source,
        energy_source,
    })
}
