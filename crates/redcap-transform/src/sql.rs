//! SQL text generation.
//!
//! Values are interpolated into the statement text. Numbers are written bare,
//! sub-selects are embedded verbatim and everything else becomes a single
//! quoted literal without escaping. Raw values are expected to have been
//! cleaned at ingestion; parameterized statements would remove that
//! requirement.

use redcap_model::Value;

/// `true` for an optional minus sign, digits and an optional decimal part.
pub fn is_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(integer) && fraction.is_none_or(digits)
}

/// Render a resolved value as a SQL operand.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::SubSelect(fragment) => fragment.clone(),
        Value::Text(text) if is_numeric(text) => text.clone(),
        Value::Text(text) => format!("'{text}'"),
        Value::List(items) => format!("'{}'", items.join(", ")),
    }
}

/// `INSERT OR IGNORE INTO table (cols) VALUES (vals);`
pub fn insert_statement(table: &str, values: &[(String, Value)]) -> String {
    let columns = values
        .iter()
        .map(|(column, _)| column.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let literals = values
        .iter()
        .map(|(_, value)| sql_literal(value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT OR IGNORE INTO {table} ({columns}) VALUES ({literals});")
}

/// Parenthesized `SELECT` used as an attribute value.
///
/// A comparison against the `NULL` sentinel becomes `IS NULL`.
pub fn search_statement(target: &str, table: &str, criteria: &[(String, Value)]) -> String {
    let conditions = criteria
        .iter()
        .map(|(column, value)| {
            if value.is_null_sentinel() {
                format!("{column} IS NULL")
            } else {
                format!("{column} = {}", sql_literal(value))
            }
        })
        .collect::<Vec<_>>();
    if conditions.is_empty() {
        return format!("(SELECT {target} FROM {table})");
    }
    format!(
        "(SELECT {target} FROM {table} WHERE {})",
        conditions.join(" AND ")
    )
}
