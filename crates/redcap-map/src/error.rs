//! Error types for mapping expressions.

use thiserror::Error;

/// A mapping expression that cannot be resolved as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// `SRCH` needs `target, table` followed by at least one `(attribute, expression)` pair.
    #[error("invalid SRCH arity: expected an even count of at least 4 arguments, found {found}")]
    SearchArity { found: usize },
    /// `__IF` needs exactly `x, y, a, b`.
    #[error("invalid __IF arity: expected 4 arguments, found {found}")]
    IfArity { found: usize },
    /// A `)` without a matching `(` or an unclosed `(`.
    #[error("unbalanced parentheses (depth {depth} at byte {offset})")]
    UnbalancedParentheses { depth: i32, offset: usize },
    /// `__IF` operands that are neither text nor lists.
    #[error("incompatible __IF operands: {0}")]
    IncompatibleOperands(String),
}

/// Errors raised while compiling mapping tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("{table}.{attribute}: {source} in expression {expression:?}")]
    Expression {
        table: String,
        attribute: String,
        expression: String,
        #[source]
        source: ExpressionError,
    },
    #[error("mapping table {0} has no rules")]
    EmptyTable(String),
}
