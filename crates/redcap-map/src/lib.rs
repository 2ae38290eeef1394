#![deny(unsafe_code)]

//! Mapping-expression grammar.
//!
//! - [`split_top_level`] and [`classify`] are the lexical layer.
//! - [`Expr`] is the parsed form of one mapping expression.
//! - [`referenced_fields`] lists the raw fields an expression reads.
//! - [`MappingSet`] holds every destination table with its rules parsed once.

pub mod compiled;
pub mod error;
pub mod expr;
pub mod split;

pub use compiled::{CompileOptions, CompiledRule, CompiledTable, LintFinding, MappingSet};
pub use error::{ExpressionError, MappingError};
pub use expr::{Conditional, Criterion, Expr, Form, Search, classify, inner_argument, referenced_fields};
pub use split::{check_balance, split_top_level};
