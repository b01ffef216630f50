use meallog_core::{MacroRecord, NutrientField};
use tracing::debug;

use crate::extract::Extractor;
use crate::types::ExtractedLabel;

/// Turn per-field extraction results into a fully populated record.
///
/// Reported energy is kept as printed; otherwise it is derived from the
/// recovered macros. Unrecovered macros become 0.0 and are listed in the
/// record's provenance.
pub fn reconcile(label: &ExtractedLabel) -> MacroRecord {
    let record = MacroRecord::assemble(
        label.value(NutrientField::Energy),
        label.value(NutrientField::Protein),
        label.value(NutrientField::Fat),
        label.value(NutrientField::Carbohydrate),
    );
    debug!(
        energy_source = %record.provenance.energy,
        defaulted = ?record.provenance.defaulted,
        energy_kcal = record.energy_kcal,
        "label reconciled"
    );
    record
}

/// Raw OCR text in, macro record out. Never fails.
pub fn parse_label(raw_text: &str) -> MacroRecord {
    reconcile(&Extractor::parse(raw_text))
}
