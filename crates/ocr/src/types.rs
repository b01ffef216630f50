use meallog_core::NutrientField;
use serde::{Deserialize, Serialize};

/// Default aggregate confidence below which a scan should be confirmed by a person.
pub const DEFAULT_REVIEW_THRESHOLD: f32 = 0.7;

/// A single extracted value with an associated confidence score (0.0–1.0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedField<T> {
    pub value: T,
    /// Confidence in this extraction (0.0 = guessed, 1.0 = certain).
    pub confidence: f32,
    /// Label phrase that produced the match, e.g. `たんぱく質`.
    pub phrase: String,
}

impl<T> ExtractedField<T> {
    pub fn new(value: T, confidence: f32, phrase: impl Into<String>) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            phrase: phrase.into(),
        }
    }
}

/// Per-field results of scanning one label. `None` means "not found in the
/// text", never "zero".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedLabel {
    pub energy_kcal: Option<ExtractedField<f64>>,
    pub protein_g: Option<ExtractedField<f64>>,
    pub fat_g: Option<ExtractedField<f64>>,
    pub carbohydrate_g: Option<ExtractedField<f64>>,
    /// Aggregate confidence across the four fields (0.0–1.0).
    pub confidence: f32,
}

impl ExtractedLabel {
    pub fn get(&self, field: NutrientField) -> Option<&ExtractedField<f64>> {
        match field {
            NutrientField::Energy => self.energy_kcal.as_ref(),
            NutrientField::Protein => self.protein_g.as_ref(),
            NutrientField::Fat => self.fat_g.as_ref(),
            NutrientField::Carbohydrate => self.carbohydrate_g.as_ref(),
        }
    }

    pub fn value(&self, field: NutrientField) -> Option<f64> {
        self.get(field).map(|f| f.value)
    }

    /// Fields that no rule matched.
    pub fn missing(&self) -> Vec<NutrientField> {
        NutrientField::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    pub fn needs_review(&self) -> bool {
        self.needs_review_at(DEFAULT_REVIEW_THRESHOLD)
    }

    pub fn needs_review_at(&self, threshold: f32) -> bool {
        self.confidence < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(v: f64) -> Option<ExtractedField<f64>> {
        Some(ExtractedField::new(v, 0.9, "x"))
    }

    #[test]
    fn extracted_field_clamps_confidence() {
        let f = ExtractedField::new(1.0, 1.5, "脂質");
        assert_eq!(f.confidence, 1.0);
        let f = ExtractedField::new(1.0, -0.1, "脂質");
        assert_eq!(f.confidence, 0.0);
    }

    #[test]
    fn missing_lists_absent_fields_in_order() {
        let label = ExtractedLabel { protein_g: field(10.0), ..Default::default() };
        assert_eq!(
            label.missing(),
            vec![NutrientField::Energy, NutrientField::Fat, NutrientField::Carbohydrate]
        );
        assert_eq!(label.value(NutrientField::Protein), Some(10.0));
        assert_eq!(label.value(NutrientField::Fat), None);
    }

    #[test]
    fn needs_review_threshold() {
        let low = ExtractedLabel { confidence: 0.5, ..Default::default() };
        assert!(low.needs_review());
        assert!(!low.needs_review_at(0.4));

        let high = ExtractedLabel { confidence: 0.9, ..low };
        assert!(!high.needs_review());
    }
}
