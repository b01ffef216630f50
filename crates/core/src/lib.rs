pub mod meal;
pub mod nutrition;

pub use meal::{EntrySource, MealDraft, MealEntry};
pub use nutrition::{
    derive_energy, EnergySource, MacroRecord, NutrientField, NutritionError, Provenance,
};
