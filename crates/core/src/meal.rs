use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::nutrition::{EnergySource, MacroRecord, NutritionError};

/// How the macros of a logged meal were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    Ocr,
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySource::Manual => write!(f, "manual"),
            EntrySource::Ocr => write!(f, "ocr"),
        }
    }
}

impl std::str::FromStr for EntrySource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(EntrySource::Manual),
            "ocr" => Ok(EntrySource::Ocr),
            other => Err(format!("Unknown entry source: '{other}'")),
        }
    }
}

/// A meal awaiting confirmation before it is written to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealDraft {
    pub food_name: String,
    pub note: Option<String>,
    pub source: EntrySource,
    pub macros: MacroRecord,
}

impl MealDraft {
    pub fn new(food_name: impl Into<String>, source: EntrySource, macros: MacroRecord) -> Self {
        Self {
            food_name: food_name.into(),
            note: None,
            source,
            macros,
        }
    }

    /// Attach a free-text note. Blank notes are dropped.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = if note.trim().is_empty() { None } else { Some(note) };
        self
    }

    /// Replace the macros with corrected values; energy is re-derived.
    pub fn amend(&mut self, protein_g: f64, fat_g: f64, carbohydrate_g: f64) -> Result<(), NutritionError> {
        self.macros = MacroRecord::from_manual(protein_g, fat_g, carbohydrate_g)?;
        Ok(())
    }

    pub fn into_entry(self, logged_at: DateTime<Utc>) -> MealEntry {
        MealEntry {
            id: None,
            logged_at,
            food_name: self.food_name,
            protein_g: self.macros.protein_g,
            fat_g: self.macros.fat_g,
            carbs_g: self.macros.carbohydrate_g,
            calories: self.macros.energy_kcal,
            note: self.note,
            source: self.source,
            energy_source: self.macros.provenance.energy,
        }
    }
}

/// One row of the meal log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: Option<i64>,
    pub logged_at: DateTime<Utc>,
    pub food_name: String,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub calories: f64,
    pub note: Option<String>,
    pub source: EntrySource,
    pub energy_source: EnergySource,
}
