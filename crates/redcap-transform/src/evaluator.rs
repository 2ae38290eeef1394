//! Resolution of parsed expressions against patient records.

use tracing::debug;

use redcap_map::{Conditional, Expr, ExpressionError, Search};
use redcap_model::{DROP_SENTINEL, Diagnostic, DiagnosticKind, Value};

use crate::scope::Scope;
use crate::sql::search_statement;

/// Evaluates expressions for one candidate instance.
///
/// `repeat` holds the records of the instance being built, `patient` holds
/// every record of the patient. Problems are appended to `diagnostics`; the
/// caller attaches table and attribute.
pub struct Evaluator<'s, 'a> {
    repeat: &'s Scope<'a>,
    patient: &'s Scope<'a>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s, 'a> Evaluator<'s, 'a> {
    pub fn new(repeat: &'s Scope<'a>, patient: &'s Scope<'a>) -> Self {
        Self {
            repeat,
            patient,
            diagnostics: Vec::new(),
        }
    }

    /// Resolve an expression. `None` means "no value".
    pub fn evaluate(&mut self, expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Field(name) | Expr::Mult(name) => Some(self.lookup(name, Lookup::Repeat)),
            Expr::Glob(name) => Some(self.lookup(name, Lookup::Patient)),
            Expr::List(name) => Some(self.list(name)),
            Expr::Set(text) => Some(Value::text(text.as_str())),
            Expr::Search(search) => Some(self.search(search)),
            Expr::If(conditional) => self.conditional(conditional),
            Expr::Auto => None,
            Expr::Drop => Some(Value::text(DROP_SENTINEL)),
            Expr::Malformed { text, error } => {
                self.raise(
                    DiagnosticKind::MalformedExpression,
                    format!("{error}: {text}"),
                );
                None
            }
        }
    }

    /// Diagnostics raised so far, leaving the evaluator empty.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn lookup(&mut self, field: &str, lookup: Lookup) -> Value {
        let scope = match lookup {
            Lookup::Repeat => self.repeat,
            Lookup::Patient => self.patient,
        };
        match scope.first(field) {
            Some(value) => Value::text(value),
            None => {
                self.raise(
                    DiagnosticKind::LookupMiss,
                    format!("field {field} not found in {} scope", lookup.as_str()),
                );
                Value::null()
            }
        }
    }

    fn list(&mut self, field: &str) -> Value {
        let values = self.repeat.all(field);
        if values.is_empty() {
            self.raise(
                DiagnosticKind::ListMiss,
                format!("no values found for list field {field}"),
            );
            return Value::Text(format!("WARN_{field}"));
        }
        Value::List(values)
    }

    fn search(&mut self, search: &Search) -> Value {
        let criteria: Vec<(String, Value)> = search
            .criteria
            .iter()
            .map(|criterion| {
                let value = self.evaluate(&criterion.expr).unwrap_or_else(Value::null);
                (criterion.attribute.clone(), value)
            })
            .collect();
        let fragment = search_statement(&search.target, &search.table, &criteria);
        debug!(
            target_column = %search.target,
            table = %search.table,
            criteria = criteria.len(),
            "search resolved"
        );
        Value::SubSelect(fragment)
    }

    fn conditional(&mut self, conditional: &Conditional) -> Option<Value> {
        let subject = self.evaluate(&conditional.subject);
        let probe = self.evaluate(&conditional.probe);
        let then = self.evaluate(&conditional.then);
        let otherwise = self.evaluate(&conditional.otherwise);
        match conditional_matches(subject.as_ref(), probe.as_ref()) {
            Ok(true) => then,
            Ok(false) => otherwise,
            Err(error) => {
                self.raise(DiagnosticKind::MalformedExpression, error.to_string());
                None
            }
        }
    }

    fn raise(&mut self, kind: DiagnosticKind, message: String) {
        self.diagnostics.push(Diagnostic::new(kind, message));
    }
}

#[derive(Debug, Clone, Copy)]
enum Lookup {
    Repeat,
    Patient,
}

impl Lookup {
    fn as_str(self) -> &'static str {
        match self {
            Self::Repeat => "repeat",
            Self::Patient => "patient",
        }
    }
}

/// Whether `probe` matches `subject` in a conditional.
///
/// Two scalars match on equality, a scalar and a list on membership in either
/// direction, and two lists when they share an element. A missing operand
/// cannot be compared.
pub fn conditional_matches(
    subject: Option<&Value>,
    probe: Option<&Value>,
) -> Result<bool, ExpressionError> {
    let (Some(subject), Some(probe)) = (subject, probe) else {
        let side = if subject.is_none() { "subject" } else { "probe" };
        return Err(ExpressionError::IncompatibleOperands(format!(
            "__IF {side} has no value"
        )));
    };
    Ok(match (subject, probe) {
        (Value::List(items), Value::List(candidates)) => {
            candidates.iter().any(|candidate| items.contains(candidate))
        }
        (Value::List(items), scalar) | (scalar, Value::List(items)) => {
            scalar.as_scalar().is_some_and(|text| items.iter().any(|item| item == text))
        }
        (subject, probe) => subject.as_scalar() == probe.as_scalar(),
    })
}
