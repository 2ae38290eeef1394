//! Cleaning applied to raw values before transformation.

/// Replace characters that would break the generated SQL text.
///
/// Quotes become a backtick and parentheses are padded with a dot, so a raw
/// value never closes a string literal or looks like a sub-select.
///
/// ```
/// use redcap_ingest::sanitize_value;
///
/// assert_eq!(sanitize_value("O'Brien"), "O`Brien");
/// assert_eq!(sanitize_value("(SELECT 1)"), ".(SELECT 1).");
/// ```
pub fn sanitize_value(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\'' | '"' => cleaned.push('`'),
            '(' => cleaned.push_str(".("),
            ')' => cleaned.push_str(")."),
            _ => cleaned.push(ch),
        }
    }
    cleaned
}
