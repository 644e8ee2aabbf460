use std::sync::OnceLock;

use regex::Regex;

/// Map Arabic-Indic digits and separators to their Western equivalents so
/// a single numeric grammar covers mixed-script bodies
pub fn normalize_numerals(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => digit_from('\u{0660}', c),
            '\u{06F0}'..='\u{06F9}' => digit_from('\u{06F0}', c),
            // Arabic decimal separator
            '\u{066B}' => '.',
            // Arabic thousands separator and Arabic comma
            '\u{066C}' | '\u{060C}' => ',',
            _ => c,
        })
        .collect()
}

fn digit_from(zero: char, c: char) -> char {
    char::from(b'0' + (c as u32 - zero as u32) as u8)
}

// Digits with optional comma separators, a single decimal point, and an
// optional trailing k multiplier
fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d[\d,]*(?:\.\d+)?)([kK]\b)?").expect("invalid amount regex")
    })
}

/// Extract numeric values from free text, in encounter order.
///
/// Arabic-Indic numerals are normalized before scanning; a `k`/`K` suffix
/// multiplies by 1000.
pub fn extract_amounts(text: &str) -> Vec<f64> {
    let normalized = normalize_numerals(text);
    let mut amounts = Vec::new();

    for caps in amount_re().captures_iter(&normalized) {
        let digits = caps[1].replace(',', "");
        let Ok(mut value) = digits.parse::<f64>() else {
            continue;
        };
        if caps.get(2).is_some() {
            value *= 1000.0;
        }
        amounts.push(value);
    }

    amounts
}
