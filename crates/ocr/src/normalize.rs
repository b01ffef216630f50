use std::sync::OnceLock;

use regex::Regex;

const FULLWIDTH_FIRST: u32 = 0xFF01;
const FULLWIDTH_LAST: u32 = 0xFF5E;
const FULLWIDTH_OFFSET: u32 = 0xFEE0;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

fn re_kcal() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?i)kcal").expect("invalid regex"))
}

/// Canonicalize raw OCR text for pattern matching.
///
/// Full-width ASCII variants (`：`, `．`, `，`, `０`–`９`, `Ｋｃａｌ`, …) fold to
/// their half-width forms, the ideographic space becomes a plain space, and
/// every casing of the energy unit becomes `kcal`. Everything else passes
/// through unchanged. The result is a fixed point: normalizing it again
/// returns the same string.
pub fn normalize(text: &str) -> String {
    let folded: String = text.chars().map(fold_width).collect();
    re_kcal().replace_all(&folded, "kcal").into_owned()
}

fn fold_width(c: char) -> char {
    match c as u32 {
        FULLWIDTH_FIRST..=FULLWIDTH_LAST => char::from_u32(c as u32 - FULLWIDTH_OFFSET).unwrap_or(c),
        _ if c == IDEOGRAPHIC_SPACE => ' ',
        _ => c,
    }
}
