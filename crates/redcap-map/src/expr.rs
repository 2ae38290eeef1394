//! Mapping-expression AST.
//!
//! Expressions use a fixed four-character prefix to select their form:
//!
//! | prefix | form |
//! |--------|------|
//! | `AUTO` | database-generated attribute, never emitted |
//! | `DROP` | discard the whole entity instance |
//! | `SET_` | literal text, `SET_(text)` |
//! | `SRCH` | nested sub-select, `SRCH(target, table, attr, expr, ...)` |
//! | `__IF` | conditional, `__IF(x, y, a, b)` |
//! | `LIST` | every matching value, `LIST(field)` |
//! | `GLOB` | lookup in the whole patient, `GLOB(field)` |
//! | `MULT` | lookup in the current repeat, fanned out per occurrence |
//!
//! Anything else is a bare field name.

use std::collections::BTreeSet;

use crate::error::ExpressionError;
use crate::split::split_top_level;

/// Expression form selected by the four-character prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Auto,
    Drop,
    Set,
    Search,
    If,
    List,
    Glob,
    Mult,
    Field,
}

impl Form {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Drop => "DROP",
            Self::Set => "SET_",
            Self::Search => "SRCH",
            Self::If => "__IF",
            Self::List => "LIST",
            Self::Glob => "GLOB",
            Self::Mult => "MULT",
            Self::Field => "FIELD",
        }
    }
}

/// Classify an expression by its prefix.
pub fn classify(text: &str) -> Form {
    match text.get(..4) {
        Some("AUTO") => Form::Auto,
        Some("DROP") => Form::Drop,
        Some("SET_") => Form::Set,
        Some("SRCH") => Form::Search,
        Some("__IF") => Form::If,
        Some("LIST") => Form::List,
        Some("GLOB") => Form::Glob,
        Some("MULT") => Form::Mult,
        _ => Form::Field,
    }
}

/// Text between `XXXX(` and the final character.
///
/// Mirrors the fixed slicing of the grammar: the fifth character is assumed to
/// be `(` and the last one `)`. Too-short input yields an empty argument.
pub fn inner_argument(text: &str) -> &str {
    if text.len() < 6 {
        return "";
    }
    text.get(5..text.len() - 1).unwrap_or("")
}

/// One `attribute = expression` criterion of a `SRCH` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub attribute: String,
    pub expr: Expr,
}

/// Parsed `SRCH(target, table, attr, expr, ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub target: String,
    pub table: String,
    pub criteria: Vec<Criterion>,
}

/// Parsed `__IF(x, y, a, b)`: `a` when `y` matches `x`, else `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub subject: Expr,
    pub probe: Expr,
    pub then: Expr,
    pub otherwise: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Field(String),
    Set(String),
    Glob(String),
    Mult(String),
    List(String),
    Search(Search),
    If(Box<Conditional>),
    Auto,
    Drop,
    /// Kept in the tree so the failure stays local to the attribute using it.
    Malformed {
        text: String,
        error: ExpressionError,
    },
}

impl Expr {
    /// Parse an expression once; nested forms are parsed recursively.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match classify(text) {
            Form::Auto => Self::Auto,
            Form::Drop => Self::Drop,
            Form::Set => Self::Set(inner_argument(text).to_string()),
            Form::List => Self::List(inner_argument(text).trim().to_string()),
            Form::Glob => Self::Glob(inner_argument(text).trim().to_string()),
            Form::Mult => Self::Mult(inner_argument(text).trim().to_string()),
            Form::Search => parse_search(text),
            Form::If => parse_conditional(text),
            Form::Field => Self::Field(text.to_string()),
        }
    }

    pub fn form(&self) -> Option<Form> {
        Some(match self {
            Self::Field(_) => Form::Field,
            Self::Set(_) => Form::Set,
            Self::Glob(_) => Form::Glob,
            Self::Mult(_) => Form::Mult,
            Self::List(_) => Form::List,
            Self::Search(_) => Form::Search,
            Self::If(_) => Form::If,
            Self::Auto => Form::Auto,
            Self::Drop => Form::Drop,
            Self::Malformed { .. } => return None,
        })
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Raw field names this expression reads, without evaluating it.
    ///
    /// `SRCH` contributes only its comparison expressions: the searched
    /// attribute, the table and the compared columns are database names.
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            Self::Field(name)
            | Self::Set(name)
            | Self::Glob(name)
            | Self::Mult(name)
            | Self::List(name) => {
                fields.insert(name.trim().to_string());
            }
            Self::Search(search) => {
                for criterion in &search.criteria {
                    criterion.expr.collect_fields(fields);
                }
            }
            Self::If(conditional) => {
                conditional.subject.collect_fields(fields);
                conditional.probe.collect_fields(fields);
                conditional.then.collect_fields(fields);
                conditional.otherwise.collect_fields(fields);
            }
            Self::Auto | Self::Drop | Self::Malformed { .. } => {}
        }
    }

    /// First `MULT` field found depth-first, if any.
    pub fn mult_field(&self) -> Option<&str> {
        match self {
            Self::Mult(name) => Some(name),
            Self::Search(search) => search
                .criteria
                .iter()
                .find_map(|criterion| criterion.expr.mult_field()),
            Self::If(conditional) => conditional
                .subject
                .mult_field()
                .or_else(|| conditional.probe.mult_field())
                .or_else(|| conditional.then.mult_field())
                .or_else(|| conditional.otherwise.mult_field()),
            _ => None,
        }
    }

    /// Every malformed sub-expression, outermost first.
    pub fn malformed(&self) -> Vec<(&str, &ExpressionError)> {
        let mut found = Vec::new();
        self.collect_malformed(&mut found);
        found
    }

    fn collect_malformed<'a>(&'a self, found: &mut Vec<(&'a str, &'a ExpressionError)>) {
        match self {
            Self::Malformed { text, error } => found.push((text, error)),
            Self::Search(search) => {
                for criterion in &search.criteria {
                    criterion.expr.collect_malformed(found);
                }
            }
            Self::If(conditional) => {
                conditional.subject.collect_malformed(found);
                conditional.probe.collect_malformed(found);
                conditional.then.collect_malformed(found);
                conditional.otherwise.collect_malformed(found);
            }
            _ => {}
        }
    }
}

fn parse_search(text: &str) -> Expr {
    let parts = split_top_level(inner_argument(text));
    if parts.len() < 4 || parts.len() % 2 != 0 {
        return Expr::Malformed {
            text: text.to_string(),
            error: ExpressionError::SearchArity { found: parts.len() },
        };
    }
    let criteria = parts[2..]
        .chunks(2)
        .map(|pair| Criterion {
            attribute: pair[0].clone(),
            expr: Expr::parse(&pair[1]),
        })
        .collect();
    Expr::Search(Search {
        target: parts[0].clone(),
        table: parts[1].clone(),
        criteria,
    })
}

fn parse_conditional(text: &str) -> Expr {
    let parts = split_top_level(inner_argument(text));
    let [subject, probe, then, otherwise] = parts.as_slice() else {
        return Expr::Malformed {
            text: text.to_string(),
            error: ExpressionError::IfArity { found: parts.len() },
        };
    };
    Expr::If(Box::new(Conditional {
        subject: Expr::parse(subject),
        probe: Expr::parse(probe),
        then: Expr::parse(then),
        otherwise: Expr::parse(otherwise),
    }))
}

/// Field names referenced by an expression text.
pub fn referenced_fields(text: &str) -> BTreeSet<String> {
    Expr::parse(text).referenced_fields()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_prefix() {
        assert_eq!(classify("AUTO"), Form::Auto);
        assert_eq!(classify("DROP"), Form::Drop);
        assert_eq!(classify("SET_(x)"), Form::Set);
        assert_eq!(classify("SRCH(a, b, c, d)"), Form::Search);
        assert_eq!(classify("__IF(a, b, c, d)"), Form::If);
        assert_eq!(classify("LIST(x)"), Form::List);
        assert_eq!(classify("GLOB(x)"), Form::Glob);
        assert_eq!(classify("MULT(x)"), Form::Mult);
        assert_eq!(classify("dob"), Form::Field);
        assert_eq!(classify("set_(x)"), Form::Field);
        assert_eq!(classify("abc"), Form::Field);
    }

    #[test]
    fn set_keeps_argument_verbatim() {
        assert_eq!(Expr::parse("SET_( a b )"), Expr::Set(" a b ".to_string()));
        assert_eq!(Expr::parse("SET_"), Expr::Set(String::new()));
    }

    #[test]
    fn search_arity_is_checked_at_parse() {
        assert_eq!(
            Expr::parse("SRCH(id, demographics, race)"),
            Expr::Malformed {
                text: "SRCH(id, demographics, race)".to_string(),
                error: ExpressionError::SearchArity { found: 3 },
            }
        );
        assert!(matches!(
            Expr::parse("SRCH(id, demographics, race, race, dob)"),
            Expr::Malformed {
                error: ExpressionError::SearchArity { found: 5 },
                ..
            }
        ));
    }

    #[test]
    fn nested_mult_is_found() {
        let expr = Expr::parse("__IF(MULT(med), SET_(none), DROP, MULT(med))");
        assert_eq!(expr.mult_field(), Some("med"));
        let expr = Expr::parse("SRCH(id, drugs, name, MULT(drug_name))");
        assert_eq!(expr.mult_field(), Some("drug_name"));
        assert_eq!(Expr::parse("GLOB(x)").mult_field(), None);
    }

    #[test]
    fn malformed_inside_conditional_is_reported() {
        let expr = Expr::parse("__IF(x, __IF(a, b), c, d)");
        let malformed = expr.malformed();
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].0, "__IF(a, b)");
    }
}
