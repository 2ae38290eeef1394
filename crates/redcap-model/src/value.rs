//! Resolved attribute values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// In-band marker for "no value found".
pub const NULL_SENTINEL: &str = "NULL";

/// Marker requesting that the whole entity instance is discarded.
pub const DROP_SENTINEL: &str = "DROP";

/// Result of resolving a mapping expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    /// Plain text, including the `NULL` and `DROP` sentinels.
    Text(String),
    /// Every matching value of a field, in record order.
    List(Vec<String>),
    /// Parenthesized `SELECT` fragment, embedded verbatim into SQL.
    SubSelect(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn null() -> Self {
        Self::Text(NULL_SENTINEL.to_string())
    }

    pub fn is_null_sentinel(&self) -> bool {
        matches!(self, Self::Text(text) if text == NULL_SENTINEL)
    }

    pub fn is_drop_sentinel(&self) -> bool {
        matches!(self, Self::Text(text) if text == DROP_SENTINEL)
    }

    /// Scalar view used for string comparisons; lists have none.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::SubSelect(text) => Some(text),
            Self::List(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::SubSelect(text) => f.write_str(text),
            Self::List(items) => f.write_str(&items.join(", ")),
        }
    }
}
