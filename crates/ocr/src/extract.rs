use std::sync::OnceLock;

use meallog_core::NutrientField;
use regex::Regex;
use tracing::debug;

use crate::normalize::normalize;
use crate::types::{ExtractedField, ExtractedLabel};

// ── Label rules ──────────────────────────────────────────────────────────────

/// One way a nutrient can be labelled. A rule matches
/// `<phrase> [:] <number> <unit>` anywhere in the text, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRule {
    pub phrase: &'static str,
    /// Confidence assigned to a value recovered by this rule.
    pub confidence: f32,
}

impl LabelRule {
    const fn new(phrase: &'static str, confidence: f32) -> Self {
        Self { phrase, confidence }
    }
}

// Order is priority: the first rule that matches decides the field.

pub const ENERGY_RULES: &[LabelRule] = &[
    LabelRule::new("エネルギー", 0.95),
    LabelRule::new("熱量", 0.92),
    LabelRule::new("energy", 0.85),
    LabelRule::new("calories", 0.80),
];

pub const PROTEIN_RULES: &[LabelRule] = &[
    LabelRule::new("たんぱく質", 0.95),
    LabelRule::new("タンパク質", 0.92),
    LabelRule::new("蛋白質", 0.90),
    LabelRule::new("protein", 0.85),
];

pub const FAT_RULES: &[LabelRule] = &[
    LabelRule::new("脂質", 0.95),
    LabelRule::new("total fat", 0.88),
    LabelRule::new("fat", 0.80),
];

pub const CARBOHYDRATE_RULES: &[LabelRule] = &[
    LabelRule::new("炭水化物", 0.95),
    LabelRule::new("糖質", 0.80),
    LabelRule::new("total carbohydrate", 0.88),
    LabelRule::new("carbohydrate", 0.85),
];

pub fn rules_for(field: NutrientField) -> &'static [LabelRule] {
    match field {
        NutrientField::Energy => ENERGY_RULES,
        NutrientField::Protein => PROTEIN_RULES,
        NutrientField::Fat => FAT_RULES,
        NutrientField::Carbohydrate => CARBOHYDRATE_RULES,
    }
}

// ── Compiled rule cache ──────────────────────────────────────────────────────

struct CompiledRule {
    rule: &'static LabelRule,
    regex: Regex,
}

impl CompiledRule {
    fn capture(&self, text: &str) -> Option<f64> {
        self.regex.captures_iter(text).find_map(|c| {
            let value: f64 = c.get(1)?.as_str().parse().ok()?;
            value.is_finite().then_some(value)
        })
    }
}

/// `<phrase> [:] <number> <unit>`. Latin phrases must not continue a longer
/// word on the left ("Saturated Fat" is not "Fat"), and the unit must not run
/// into further letters ("5gal" is not grams).
fn rule_pattern(phrase: &str, unit: &str) -> String {
    let left = if phrase.starts_with(|c: char| c.is_ascii_alphabetic()) {
        r"(?:^|[^A-Za-z])"
    } else {
        ""
    };
    let phrase = regex::escape(phrase).replace(' ', r"\s+");
    format!(
        r"(?i){left}{phrase}\s*:?\s*([0-9]+(?:\.[0-9]+)?)\s*{}(?:$|[^A-Za-z])",
        regex::escape(unit)
    )
}

fn compile(field: NutrientField) -> Vec<CompiledRule> {
    rules_for(field)
        .iter()
        .map(|rule| CompiledRule {
            rule,
            regex: Regex::new(&rule_pattern(rule.phrase, field.unit())).expect("invalid label rule"),
        })
        .collect()
}

macro_rules! rule_set {
    ($name:ident, $field:expr) => {
        fn $name() -> &'static [CompiledRule] {
            static R: OnceLock<Vec<CompiledRule>> = OnceLock::new();
            R.get_or_init(|| compile($field))
        }
    };
}

rule_set!(energy_rules, NutrientField::Energy);
rule_set!(protein_rules, NutrientField::Protein);
rule_set!(fat_rules, NutrientField::Fat);
rule_set!(carbohydrate_rules, NutrientField::Carbohydrate);

fn compiled(field: NutrientField) -> &'static [CompiledRule] {
    match field {
        NutrientField::Energy => energy_rules(),
        NutrientField::Protein => protein_rules(),
        NutrientField::Fat => fat_rules(),
        NutrientField::Carbohydrate => carbohydrate_rules(),
    }
}

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Normalize raw OCR text, then extract.
    pub fn parse(raw_text: &str) -> ExtractedLabel {
        Self::extract(&normalize(raw_text))
    }

    /// Extract the four nutrient fields from already-normalized text.
    pub fn extract(text: &str) -> ExtractedLabel {
        let energy_kcal = Self::extract_field(text, NutrientField::Energy);
        let protein_g = Self::extract_field(text, NutrientField::Protein);
        let fat_g = Self::extract_field(text, NutrientField::Fat);
        let carbohydrate_g = Self::extract_field(text, NutrientField::Carbohydrate);

        // Equal weight per field; a missing field contributes zero.
        let confidence = [&energy_kcal, &protein_g, &fat_g, &carbohydrate_g]
            .into_iter()
            .map(|f| f.as_ref().map_or(0.0, |f| f.confidence))
            .sum::<f32>()
            / 4.0;

        ExtractedLabel {
            energy_kcal,
            protein_g,
            fat_g,
            carbohydrate_g,
            confidence,
        }
    }

    /// Run one field's rules in order and keep the first hit.
    pub fn extract_field(text: &str, field: NutrientField) -> Option<ExtractedField<f64>> {
        compiled(field).iter().find_map(|cr| {
            let value = cr.capture(text)?;
            debug!(%field, phrase = cr.rule.phrase, value, "label rule matched");
            Some(ExtractedField::new(value, cr.rule.confidence, cr.rule.phrase))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const JP_LABEL: &str = "栄養成分表示(1個当たり)\n\
        エネルギー 250kcal\n\
        たんぱく質 10.2g\n\
        脂質 5g\n\
        炭水化物 30.5g\n\
        食塩相当量 0.8g";

    // ── Individual rules ─────────────────────────────────────────────────────

    #[test]
    fn every_rule_matches_its_own_phrase() {
        for field in NutrientField::ALL {
            for (idx, cr) in compiled(field).iter().enumerate() {
                let text = format!("{} 12{}", cr.rule.phrase, field.unit());
                assert_eq!(cr.capture(&text), Some(12.0), "{field} rule #{idx} ({})", cr.rule.phrase);
            }
        }
    }

    #[test]
    fn compiled_order_matches_declared_order() {
        for field in NutrientField::ALL {
            let phrases: Vec<_> = compiled(field).iter().map(|cr| cr.rule.phrase).collect();
            let declared: Vec<_> = rules_for(field).iter().map(|r| r.phrase).collect();
            assert_eq!(phrases, declared);
        }
    }

    // ── Fields ───────────────────────────────────────────────────────────────

    #[test]
    fn extract_japanese_label() {
        let r = Extractor::extract(JP_LABEL);
        assert_eq!(r.value(NutrientField::Energy), Some(250.0));
        assert_eq!(r.value(NutrientField::Protein), Some(10.2));
        assert_eq!(r.value(NutrientField::Fat), Some(5.0));
        assert_eq!(r.value(NutrientField::Carbohydrate), Some(30.5));
        assert_eq!(r.protein_g.unwrap().phrase, "たんぱく質");
    }

    #[test]
    fn extract_english_label() {
        let text = "Nutrition Facts\nEnergy 180kcal\nProtein 7g\nTotal Fat 4.5g\n\
                    Saturated Fat 1g\nTotal Carbohydrate 28g\nSodium 140mg";
        let r = Extractor::extract(text);
        assert_eq!(r.value(NutrientField::Energy), Some(180.0));
        assert_eq!(r.value(NutrientField::Protein), Some(7.0));
        assert_eq!(r.value(NutrientField::Fat), Some(4.5));
        assert_eq!(r.value(NutrientField::Carbohydrate), Some(28.0));
    }

    #[test]
    fn separators_are_optional() {
        for text in ["脂質:5g", "脂質: 5g", "脂質 5 g", "脂質5g", "脂質\n5g"] {
            assert_eq!(
                Extractor::extract_field(text, NutrientField::Fat).map(|f| f.value),
                Some(5.0),
                "{text:?}"
            );
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let r = Extractor::extract("PROTEIN 10G\nENERGY 99KCAL");
        assert_eq!(r.value(NutrientField::Protein), Some(10.0));
        assert_eq!(r.value(NutrientField::Energy), Some(99.0));
    }

    // ── Priority ─────────────────────────────────────────────────────────────

    #[test]
    fn earlier_synonym_wins_regardless_of_position() {
        let text = "タンパク質 8g\nたんぱく質 12g";
        assert_eq!(Extractor::extract(text).value(NutrientField::Protein), Some(12.0));

        let text = "熱量 300kcal\nエネルギー 250kcal";
        assert_eq!(Extractor::extract(text).value(NutrientField::Energy), Some(250.0));
    }

    #[test]
    fn later_synonym_used_when_earlier_absent() {
        assert_eq!(Extractor::extract("熱量 300kcal").value(NutrientField::Energy), Some(300.0));
        assert_eq!(Extractor::extract("糖質 25g").value(NutrientField::Carbohydrate), Some(25.0));
    }

    #[test]
    fn carbohydrate_preferred_over_sugar_breakdown() {
        let text = "炭水化物 30g\n-糖質 25g\n-食物繊維 5g";
        assert_eq!(Extractor::extract(text).value(NutrientField::Carbohydrate), Some(30.0));
    }

    #[test]
    fn earlier_rule_wins_over_a_later_rule_with_an_earlier_position() {
        let text = "Saturated Fat 1g\nTotal Fat 8g";
        assert_eq!(Extractor::extract(text).value(NutrientField::Fat), Some(8.0));
    }

    #[test]
    fn fat_rule_skips_saturated_and_trans_fat() {
        let text = "Saturated Fat 1g\nTrans Fat 0g\nFat 8g";
        assert_eq!(Extractor::extract(text).value(NutrientField::Fat), Some(8.0));
    }

    #[test]
    fn latin_phrase_at_start_of_text_still_matches() {
        assert_eq!(Extractor::extract("Fat 8g").value(NutrientField::Fat), Some(8.0));
        assert_eq!(Extractor::extract("(Fat 8g)").value(NutrientField::Fat), Some(8.0));
    }

    // ── Malformed input ──────────────────────────────────────────────────────

    #[test]
    fn unit_must_not_run_into_a_longer_word() {
        assert!(Extractor::extract_field("Protein 5gal", NutrientField::Protein).is_none());
        assert!(Extractor::extract_field("Energy 90kcals", NutrientField::Energy).is_none());
    }

    #[test]
    fn unit_may_be_followed_by_japanese_or_punctuation() {
        assert_eq!(
            Extractor::extract_field("たんぱく質 10g当たり", NutrientField::Protein).map(|f| f.value),
            Some(10.0)
        );
        assert_eq!(
            Extractor::extract_field("脂質 5g, 炭水化物 30g", NutrientField::Fat).map(|f| f.value),
            Some(5.0)
        );
    }

    #[test]
    fn non_ascii_digits_do_not_hide_a_later_valid_line() {
        let text = "たんぱく質 \u{0663}g\nたんぱく質 10g";
        assert_eq!(Extractor::extract(text).value(NutrientField::Protein), Some(10.0));
    }

    #[test]
    fn garbled_digit_does_not_match() {
        assert!(Extractor::extract_field("たんぱく質 1Og", NutrientField::Protein).is_none());
    }

    #[test]
    fn wrong_or_missing_unit_does_not_match() {
        assert!(Extractor::extract_field("たんぱく質 10mg", NutrientField::Protein).is_none());
        assert!(Extractor::extract_field("たんぱく質 10", NutrientField::Protein).is_none());
        assert!(Extractor::extract_field("エネルギー 250", NutrientField::Energy).is_none());
        assert!(Extractor::extract_field("エネルギー 250g", NutrientField::Energy).is_none());
    }

    #[test]
    fn empty_text_finds_nothing() {
        let r = Extractor::extract("");
        assert_eq!(r.missing(), NutrientField::ALL.to_vec());
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let _ = Extractor::parse("!@#$%^&*()\n\0\x01\x02\u{FFFF}");
        let _ = Extractor::parse(&"9".repeat(500));
    }

    // ── Normalization ────────────────────────────────────────────────────────

    #[test]
    fn fullwidth_text_extracts_like_halfwidth() {
        let full = Extractor::parse("エネルギー：２５０Ｋｃａｌ\nたんぱく質：１０．５ｇ");
        let half = Extractor::parse("エネルギー:250kcal\nたんぱく質:10.5g");
        assert_eq!(full, half);
        assert_eq!(full.value(NutrientField::Energy), Some(250.0));
        assert_eq!(full.value(NutrientField::Protein), Some(10.5));
    }

    #[test]
    fn parse_is_deterministic() {
        assert_eq!(Extractor::parse(JP_LABEL), Extractor::parse(JP_LABEL));
    }

    // ── Confidence ───────────────────────────────────────────────────────────

    #[test]
    fn confidence_high_for_complete_label() {
        let r = Extractor::extract(JP_LABEL);
        assert!(r.confidence >= 0.9, "confidence was {}", r.confidence);
        assert!(!r.needs_review());
    }

    #[test]
    fn confidence_low_for_partial_label() {
        let r = Extractor::extract("たんぱく質 10g");
        assert!(r.confidence < 0.3, "confidence was {}", r.confidence);
        assert!(r.needs_review());
    }
}
