//! Top-level argument splitting.

use crate::error::ExpressionError;

/// Split a comma-separated argument list, ignoring commas nested in parentheses.
///
/// Every part is trimmed. Unbalanced parentheses are tolerated: a stray `)`
/// drives the depth negative and commas are no longer separators until it
/// recovers. Use [`check_balance`] to detect such input.
///
/// ```
/// use redcap_map::split_top_level;
///
/// assert_eq!(
///     split_top_level("w, SET_(x), y, z"),
///     vec!["w", "SET_(x)", "y", "z"]
/// );
/// ```
pub fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Verify that every `(` is closed and no `)` appears before its opener.
pub fn check_balance(text: &str) -> Result<(), ExpressionError> {
    let mut depth = 0i32;
    for (offset, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ExpressionError::UnbalancedParentheses { depth, offset });
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ExpressionError::UnbalancedParentheses {
            depth,
            offset: text.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_nested_arguments_together() {
        assert_eq!(
            split_top_level("id, demographics, race, SRCH(code, races, label, race)"),
            vec!["id", "demographics", "race", "SRCH(code, races, label, race)"]
        );
    }

    #[test]
    fn trailing_comma_drops_empty_tail() {
        assert_eq!(split_top_level("a, b,"), vec!["a", "b"]);
        assert_eq!(split_top_level("a,,b"), vec!["a", "", "b"]);
        assert!(split_top_level("").is_empty());
    }

    #[test]
    fn stray_closer_suppresses_splitting() {
        assert_eq!(split_top_level("a), b, c"), vec!["a), b, c"]);
        assert!(check_balance("a), b, c").is_err());
    }

    #[test]
    fn balance_reports_unclosed_opener() {
        assert_eq!(
            check_balance("SET_(x"),
            Err(ExpressionError::UnbalancedParentheses {
                depth: 1,
                offset: 6
            })
        );
        assert!(check_balance("__IF(SET_(a), b, c, d)").is_ok());
    }
}
