//! Normalization of text fields extracted from a search surface.
//!
//! Surfaces decorate listings with icons and directional marks that
//! leak into scraped strings. These helpers strip everything outside
//! printable ASCII and Latin-1 supplement, then tidy whitespace.

/// Cleans a free-text field (business name, address).
pub fn clean_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| matches!(*c as u32, 0x20..=0x7E | 0xA0..=0xFF))
        .collect();
    collapse_whitespace(&filtered)
}

/// Cleans a phone field, keeping digits and common phone punctuation.
pub fn clean_phone(raw: &str) -> Option<String> {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.'))
        .collect();
    let cleaned = collapse_whitespace(&filtered);
    let digits = cleaned.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= 7 {
        Some(cleaned)
    } else {
        None
    }
}

/// Cleans a website field. Anything without a dot is surface chrome
/// ("Menu", "Directions") rather than a URL.
pub fn clean_website(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.contains('.') && !cleaned.contains("google.com") {
        Some(cleaned)
    } else {
        None
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
