/// Term match with letter boundaries on both sides.
///
/// Neighbors may be digits or punctuation but not letters, so `له` inside a
/// longer Arabic word or `le` inside "sale" never count, while `500جنيه`
/// with no space does. Works for Arabic and Latin terms alike.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    for (pos, _) in haystack.match_indices(term) {
        let before_ok = haystack[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphabetic());
        let after_ok = haystack[pos + term.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphabetic());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

/// Test for currency vocabulary anywhere in the body
pub fn has_currency_hint(text: &str, terms: &[String]) -> bool {
    let lower = text.to_lowercase();
    terms.iter().any(|t| contains_term(&lower, t))
}

/// Test for total/subtotal vocabulary anywhere in the body
pub fn is_total_line(text: &str, terms: &[String]) -> bool {
    let lower = text.to_lowercase();
    terms.iter().any(|t| contains_term(&lower, t))
}
