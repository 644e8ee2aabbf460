pub mod currency;
pub mod numerals;

pub use currency::{contains_term, has_currency_hint, is_total_line};
pub use numerals::{extract_amounts, normalize_numerals};

use crate::models::{ExpenseCandidate, ParsedMessage};

/// Configuration for the expense detection heuristics
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Values below this are treated as item counts, not currency
    pub min_significant: f64,
    /// Currency vocabulary, Arabic words plus Latin abbreviation forms
    pub currency_terms: Vec<String>,
    /// Total/subtotal vocabulary, Arabic and English variants
    pub total_terms: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_significant: 10.0,
            currency_terms: vec![
                "جنيه".to_string(),
                "جنيها".to_string(),
                "جنيهات".to_string(),
                "جنية".to_string(),
                "ج.م".to_string(),
                "egp".to_string(),
                "le".to_string(),
                "l.e".to_string(),
                "£".to_string(),
            ],
            total_terms: vec![
                "الاجمالي".to_string(),
                "الإجمالي".to_string(),
                "اجمالي".to_string(),
                "إجمالي".to_string(),
                "المجموع".to_string(),
                "مجموع".to_string(),
                "total".to_string(),
                "subtotal".to_string(),
                "grand total".to_string(),
            ],
        }
    }
}

/// Detect expense candidates among parsed messages.
///
/// Bilingual numeral extraction, a significance filter against item
/// counts, currency-hint and total-line vocabulary tests, then amount
/// selection: with several significant numbers the maximum wins, since
/// receipts list line items under a grand total. Ambiguity is encoded in
/// `needs_review`/`excluded`, never silently dropped. Candidate order
/// follows message order, at most one candidate per message.
pub fn detect_expenses(messages: &[ParsedMessage], config: &DetectorConfig) -> Vec<ExpenseCandidate> {
    let mut candidates = Vec::new();

    for message in messages {
        // Pure media messages have no residual text to detect in
        if message.notes.is_empty() {
            continue;
        }

        let significant: Vec<f64> = extract_amounts(&message.notes)
            .into_iter()
            .filter(|v| *v >= config.min_significant)
            .collect();
        let Some(amount) = significant.iter().copied().reduce(f64::max) else {
            continue;
        };

        let has_currency = has_currency_hint(&message.notes, &config.currency_terms);
        let is_total = is_total_line(&message.notes, &config.total_terms);

        candidates.push(ExpenseCandidate {
            message: message.clone(),
            amount,
            needs_review: significant.len() > 1 || !has_currency,
            is_total_line: is_total,
            excluded: is_total || !has_currency,
            category: None,
        });
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_transcript;

    fn detect(raw: &str) -> Vec<ExpenseCandidate> {
        let outcome = parse_transcript(raw);
        detect_expenses(&outcome.messages, &DetectorConfig::default())
    }

    #[test]
    fn test_simple_currency_amount() {
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: دفعت 500 جنيه للدهان");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 500.0);
        assert!(!candidates[0].needs_review);
        assert!(!candidates[0].excluded);
        assert!(!candidates[0].is_total_line);
    }

    #[test]
    fn test_arabic_indic_amount() {
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: المصنعية ١٢٥٠ جنيه");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 1250.0);
    }

    #[test]
    fn test_two_amounts_selects_max_and_flags_review() {
        let candidates =
            detect("[2025-10-08, 22:07:34] Ahmed: الإجمالي 500 جنيه، دفعت 300 جنيه");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 500.0);
        assert!(candidates[0].needs_review);
    }

    #[test]
    fn test_total_line_excluded_but_present() {
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: total 1200 LE");

        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_total_line);
        assert!(candidates[0].excluded);
        // Single amount with a currency hint still reads cleanly
        assert!(!candidates[0].needs_review);
    }

    #[test]
    fn test_missing_currency_hint_excluded_and_review() {
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: paid 500 for paint");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 500.0);
        assert!(candidates[0].needs_review);
        assert!(candidates[0].excluded);
    }

    #[test]
    fn test_item_counts_below_threshold_ignored() {
        // 2 and 3 are item counts; only 150 is significant
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: 2 bags, 3 rollers, 150 جنيه");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 150.0);
        assert!(!candidates[0].needs_review);
    }

    #[test]
    fn test_no_significant_numbers_no_candidate() {
        assert!(detect("[2025-10-08, 22:07:34] Ahmed: bought 2 bags").is_empty());
        assert!(detect("[2025-10-08, 22:07:34] Ahmed: thanks!").is_empty());
    }

    #[test]
    fn test_k_suffix_amount() {
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: حولت 5k جنيه للنجار");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 5000.0);
    }

    #[test]
    fn test_pure_media_message_never_a_candidate() {
        let candidates = detect("[2025-10-08, 22:07:34] Ahmed: <attached: 500-receipt.jpg>");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_candidate_order_follows_message_order() {
        let raw = "[2025-10-08, 22:07:34] Ahmed: سباكة 300 جنيه\n\
                   [2025-10-08, 22:09:00] Omar: not an expense\n\
                   [2025-10-08, 22:10:00] Omar: كهرباء 450 جنيه";
        let candidates = detect(raw);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].amount, 300.0);
        assert_eq!(candidates[1].amount, 450.0);
    }
}
