use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use meallog_core::{EntrySource, MacroRecord, MealDraft, MealEntry};
use meallog_ocr::{configured_backend, LabelPipeline, LabelScan};
use meallog_storage::DbPool;

use crate::config::AppConfig;

pub struct ManualInput {
    pub food_name: String,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub note: Option<String>,
    pub dry_run: bool,
}

pub struct ScanInput {
    pub image: PathBuf,
    pub food_name: String,
    pub note: Option<String>,
    /// Corrections applied before saving; unset fields keep the scanned value.
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
    /// Save even when the scan is flagged for review.
    pub yes: bool,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ScanOutput<'a> {
    ocr_text: &'a str,
    record: &'a MacroRecord,
    confidence: f32,
    needs_review: bool,
}

pub async fn open_db(config: &AppConfig) -> Result<DbPool> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }
    meallog_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open meal log {}", db_path.display()))
}

pub async fn log_manual(pool: &DbPool, input: ManualInput, json: bool) -> Result<()> {
    let macros = MacroRecord::from_manual(input.protein_g, input.fat_g, input.carbs_g)?;
    let mut draft = MealDraft::new(input.food_name, EntrySource::Manual, macros);
    if let Some(note) = input.note {
        draft = draft.with_note(note);
    }
    save_draft(pool, draft, input.dry_run, json).await
}

/// Run the extractor on text that was recognized elsewhere.
pub fn parse_text(source: &Path, config: &AppConfig, json: bool) -> Result<()> {
    let text = if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source.display()))?
    };

    let scan = LabelScan::from_text(text, config.review.confidence_threshold);
    print_scan(&scan, json)
}

pub async fn scan_photo(pool: &DbPool, config: &AppConfig, input: ScanInput, json: bool) -> Result<()> {
    let backend = configured_backend(config.ocr.tessdata_path.clone(), &config.ocr.language);
    let pipeline = LabelPipeline::new(backend).with_review_threshold(config.review.confidence_threshold);

    let scan = pipeline
        .process_file(&input.image)
        .await
        .with_context(|| format!("Failed to scan {}", input.image.display()))?;
    print_scan(&scan, json)?;

    let needs_review = scan.needs_review;
    let mut draft = scan.into_draft(input.food_name);
    if let Some(note) = input.note {
        draft = draft.with_note(note);
    }

    let corrected = input.protein_g.is_some() || input.fat_g.is_some() || input.carbs_g.is_some();
    if corrected {
        let p = input.protein_g.unwrap_or(draft.macros.protein_g);
        let f = input.fat_g.unwrap_or(draft.macros.fat_g);
        let c = input.carbs_g.unwrap_or(draft.macros.carbohydrate_g);
        draft.amend(p, f, c)?;
    }

    if needs_review && !corrected && !input.yes {
        tracing::warn!("Scan confidence is low; not saved");
        eprintln!("Review the values above, then re-run with --yes to save or pass --protein/--fat/--carbs to correct them.");
        return Ok(());
    }

    save_draft(pool, draft, input.dry_run, json).await
}

pub async fn list(pool: &DbPool, limit: u32, json: bool) -> Result<()> {
    let entries = meallog_storage::get_recent_meal_entries(pool, limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for e in &entries {
        print_entry(e);
    }
    Ok(())
}

pub async fn export(pool: &DbPool, output: &Path, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let entries = match (from, to) {
        (None, None) => meallog_storage::get_all_meal_entries(pool).await?,
        (from, to) => {
            let start = from.map(start_of_day).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let end = match to {
                Some(d) => start_of_day(d.succ_opt().unwrap_or(d)),
                None => Utc::now(),
            };
            meallog_storage::get_meal_entries_between(pool, start, end).await?
        }
    };

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    meallog_storage::write_csv(&entries, file)?;
    tracing::info!("Exported {} entries to {}", entries.len(), output.display());
    Ok(())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

async fn save_draft(pool: &DbPool, draft: MealDraft, dry_run: bool, json: bool) -> Result<()> {
    let entry = draft.into_entry(Utc::now());
    let entry = if dry_run {
        entry
    } else {
        let id = meallog_storage::append_meal_entry(pool, &entry).await?;
        MealEntry { id: Some(id), ..entry }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        print_entry(&entry);
        if dry_run {
            println!("(dry run, not saved)");
        }
    }
    Ok(())
}

fn print_scan(scan: &LabelScan, json: bool) -> Result<()> {
    if json {
        let out = ScanOutput {
            ocr_text: &scan.ocr_text,
            record: &scan.record,
            confidence: scan.extracted.confidence,
            needs_review: scan.needs_review,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let r = &scan.record;
    println!("energy        {:>8.0} kcal ({})", r.energy_kcal, r.provenance.energy);
    println!("protein       {:>8.1} g", r.protein_g);
    println!("fat           {:>8.1} g", r.fat_g);
    println!("carbohydrate  {:>8.1} g", r.carbohydrate_g);
    if !r.is_complete() {
        let missing: Vec<String> = r.provenance.defaulted.iter().map(|f| f.to_string()).collect();
        println!("not found: {}", missing.join(", "));
    }
    println!("confidence    {:>8.2}{}", scan.extracted.confidence, if scan.needs_review { "  (review)" } else { "" });
    Ok(())
}

fn print_entry(e: &MealEntry) {
    let id = e.id.map(|id| format!("#{id}")).unwrap_or_else(|| "-".to_string());
    println!(
        "{id:>5}  {}  {:<20}  P {:>5.1}  F {:>5.1}  C {:>5.1}  {:>5.0} kcal  [{}]{}",
        e.logged_at.format("%Y-%m-%d %H:%M"),
        e.food_name,
        e.protein_g,
        e.fat_g,
        e.carbs_g,
        e.calories,
        e.source,
        e.note.as_deref().map(|n| format!("  {n}")).unwrap_or_default(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig { data_dir: Some(dir.to_path_buf()), ..Default::default() }
    }

    fn manual_input(name: &str, dry_run: bool) -> ManualInput {
        ManualInput {
            food_name: name.to_string(),
            protein_g: 10.0,
            fat_g: 5.0,
            carbs_g: 30.0,
            note: Some("test".to_string()),
            dry_run,
        }
    }

    #[tokio::test]
    async fn manual_entry_is_saved_with_derived_calories() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_db(&config_in(dir.path())).await.unwrap();

        log_manual(&pool, manual_input("rice ball", false), false).await.unwrap();

        let entries = meallog_storage::get_recent_meal_entries(&pool, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].calories, 205.0);
        assert_eq!(entries[0].source, EntrySource::Manual);
    }

    #[tokio::test]
    async fn dry_run_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_db(&config_in(dir.path())).await.unwrap();

        log_manual(&pool, manual_input("rice ball", true), true).await.unwrap();

        assert!(meallog_storage::get_recent_meal_entries(&pool, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_manual_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_db(&config_in(dir.path())).await.unwrap();
        let input = ManualInput { protein_g: -1.0, ..manual_input("x", false) };

        assert!(log_manual(&pool, input, false).await.is_err());
    }

    #[tokio::test]
    async fn export_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_db(&config_in(dir.path())).await.unwrap();
        log_manual(&pool, manual_input("natto", false), false).await.unwrap();

        let out = dir.path().join("meals.csv");
        export(&pool, &out, None, None).await.unwrap();

        let csv = std::fs::read_to_string(&out).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().contains(",natto,10,5,30,205,test,manual"));
    }

    #[test]
    fn parse_text_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.txt");
        std::fs::write(&path, "エネルギー：２５０Ｋｃａｌ").unwrap();
        parse_text(&path, &AppConfig::default(), true).unwrap();
    }

    #[test]
    fn start_of_day_is_midnight_utc() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(start_of_day(d).to_rfc3339(), "2026-10-15T00:00:00+00:00");
    }
}
