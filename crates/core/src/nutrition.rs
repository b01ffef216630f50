use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Atwater energy factors (kcal per gram).
pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
pub const CARBOHYDRATE_KCAL_PER_G: f64 = 4.0;
pub const FAT_KCAL_PER_G: f64 = 9.0;

/// Estimate energy from macro masses using the Atwater factors.
///
/// This is the single source of the energy formula: manual entry, label
/// reconciliation and draft amendment all go through it.
pub fn derive_energy(protein_g: f64, fat_g: f64, carbohydrate_g: f64) -> f64 {
    protein_g * PROTEIN_KCAL_PER_G + carbohydrate_g * CARBOHYDRATE_KCAL_PER_G + fat_g * FAT_KCAL_PER_G
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientField {
    Energy,
    Protein,
    Fat,
    Carbohydrate,
}

impl NutrientField {
    pub const ALL: [NutrientField; 4] = [
        NutrientField::Energy,
        NutrientField::Protein,
        NutrientField::Fat,
        NutrientField::Carbohydrate,
    ];

    /// Unit the value of this field is expressed in.
    pub fn unit(self) -> &'static str {
        match self {
            NutrientField::Energy => "kcal",
            _ => "g",
        }
    }
}

impl fmt::Display for NutrientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NutrientField::Energy => write!(f, "energy"),
            NutrientField::Protein => write!(f, "protein"),
            NutrientField::Fat => write!(f, "fat"),
            NutrientField::Carbohydrate => write!(f, "carbohydrate"),
        }
    }
}

/// Where a record's energy figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    /// Printed on the label and read verbatim.
    Reported,
    /// Computed from the macros with [`derive_energy`].
    Derived,
}

impl fmt::Display for EnergySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergySource::Reported => write!(f, "reported"),
            EnergySource::Derived => write!(f, "derived"),
        }
    }
}

impl std::str::FromStr for EnergySource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reported" => Ok(EnergySource::Reported),
            "derived" => Ok(EnergySource::Derived),
            other => Err(format!("Unknown energy source: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub energy: EnergySource,
    /// Fields that were not recovered. Missing macros are filled in as 0.0;
    /// missing energy is derived from the macros instead (see `energy`).
    pub defaulted: Vec<NutrientField>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NutritionError {
    #[error("{field} must be a finite, non-negative amount (got {value})")]
    InvalidAmount { field: NutrientField, value: f64 },
}

/// A fully populated macro-nutrient record. All amounts are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub energy_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbohydrate_g: f64,
    pub provenance: Provenance,
}

impl MacroRecord {
    /// Build a record from user-entered grams. Energy is always derived.
    pub fn from_manual(protein_g: f64, fat_g: f64, carbohydrate_g: f64) -> Result<Self, NutritionError> {
        let protein_g = check_amount(NutrientField::Protein, protein_g)?;
        let fat_g = check_amount(NutrientField::Fat, fat_g)?;
        let carbohydrate_g = check_amount(NutrientField::Carbohydrate, carbohydrate_g)?;

        Ok(MacroRecord {
            energy_kcal: derive_energy(protein_g, fat_g, carbohydrate_g),
            protein_g,
            fat_g,
            carbohydrate_g,
            provenance: Provenance { energy: EnergySource::Derived, defaulted: vec![] },
        })
    }

    /// Assemble a record from optional per-field values.
    ///
    /// A present energy value is kept verbatim; otherwise energy is derived
    /// from whatever macros are present, with absent macros counted as 0.0.
    /// Absent, negative or non-finite values are filled with 0.0 and listed
    /// in `provenance.defaulted`.
    pub fn assemble(
        energy_kcal: Option<f64>,
        protein_g: Option<f64>,
        fat_g: Option<f64>,
        carbohydrate_g: Option<f64>,
    ) -> Self {
        let mut defaulted = Vec::new();
        let mut resolve = |field: NutrientField, value: Option<f64>| -> Option<f64> {
            match value.and_then(|v| check_amount(field, v).ok()) {
                Some(v) => Some(v),
                None => {
                    defaulted.push(field);
                    None
                }
            }
        };

        let energy = resolve(NutrientField::Energy, energy_kcal);
        let protein_g = resolve(NutrientField::Protein, protein_g).unwrap_or(0.0);
        let fat_g = resolve(NutrientField::Fat, fat_g).unwrap_or(0.0);
        let carbohydrate_g = resolve(NutrientField::Carbohydrate, carbohydrate_g).unwrap_or(0.0);

        let (energy_kcal, source) = match energy {
            Some(kcal) => (kcal, EnergySource::Reported),
            None => (derive_energy(protein_g, fat_g, carbohydrate_g), EnergySource::Derived),
        };

        MacroRecord {
            energy_kcal,
            protein_g,
            fat_g,
            carbohydrate_g,
            provenance: Provenance { energy: source, defaulted },
        }
    }

    pub fn zero() -> Self {
        Self::assemble(None, None, None, None)
    }

    /// Energy implied by this record's macros, regardless of provenance.
    pub fn derived_energy(&self) -> f64 {
        derive_energy(self.protein_g, self.fat_g, self.carbohydrate_g)
    }

    /// True when every macro field was actually recovered.
    pub fn is_complete(&self) -> bool {
        self.provenance.defaulted.is_empty()
    }
}

fn check_amount(field: NutrientField, value: f64) -> Result<f64, NutritionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(NutritionError::InvalidAmount { field, value })
    }
}
