use meallog_core::MealEntry;
use std::io::Write;

use crate::db::StorageError;

/// Column order of the exported sheet.
pub const CSV_HEADER: [&str; 8] = [
    "timestamp",
    "food_name",
    "protein_g",
    "fat_g",
    "carbs_g",
    "calories",
    "note",
    "source",
];

/// Write entries as spreadsheet-friendly CSV, one row per meal.
pub fn write_csv<W: Write>(entries: &[MealEntry], writer: W) -> Result<(), StorageError> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(CSV_HEADER)?;

    for e in entries {
        w.write_record([
            e.logged_at.to_rfc3339(),
            e.food_name.clone(),
            e.protein_g.to_string(),
            e.fat_g.to_string(),
            e.carbs_g.to_string(),
            e.calories.to_string(),
            e.note.clone().unwrap_or_default(),
            e.source.to_string(),
        ])?;
    }

    w.flush()?;
    Ok(())
}
