//! Mapping tables compiled into expression trees.
//!
//! Every rule's expression is parsed once when the set is built. The compiled
//! [`MappingSet`] is immutable and is shared by reference across workers.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use redcap_model::{MappingRule, MappingTable};

use crate::error::{ExpressionError, MappingError};
use crate::expr::Expr;
use crate::split::check_balance;

/// A mapping rule with its parsed expression.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: MappingRule,
    /// `None` when the attribute has no mapping expression.
    pub expr: Option<Expr>,
}

impl CompiledRule {
    pub fn compile(rule: MappingRule) -> Self {
        let expr = rule.expression.as_deref().map(Expr::parse);
        Self { rule, expr }
    }

    /// Rules that take part in evaluation: mapped and not database-generated.
    pub fn is_active(&self) -> bool {
        self.expr.as_ref().is_some_and(|expr| !expr.is_auto())
    }
}

/// A problem found while compiling a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub table: String,
    pub attribute: String,
    pub expression: String,
    pub problem: ExpressionError,
}

/// Compilation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Reject unbalanced parentheses instead of reporting them.
    pub strict_expressions: bool,
}

/// One destination table with its compiled rules.
#[derive(Debug, Clone)]
pub struct CompiledTable {
    pub table: String,
    pub rules: Vec<CompiledRule>,
    fields: BTreeSet<String>,
    mult_field: Option<String>,
}

impl CompiledTable {
    pub fn compile(table: MappingTable) -> Self {
        let rules: Vec<CompiledRule> = table.rules.into_iter().map(CompiledRule::compile).collect();
        let mut fields = BTreeSet::new();
        let mut mult_field = None;
        for compiled in rules.iter().filter(|rule| rule.is_active()) {
            let Some(expr) = &compiled.expr else {
                continue;
            };
            fields.extend(expr.referenced_fields());
            if mult_field.is_none() {
                mult_field = expr.mult_field().map(str::to_string);
            }
        }
        Self {
            table: table.table,
            rules,
            fields,
            mult_field,
        }
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(|rule| rule.is_active())
    }

    pub fn has_active_rules(&self) -> bool {
        self.active_rules().next().is_some()
    }

    /// Union of the fields referenced by the active rules.
    pub fn referenced_fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    /// Field fanned out into one instance per occurrence, if any rule uses `MULT`.
    pub fn mult_field(&self) -> Option<&str> {
        self.mult_field.as_deref()
    }

    /// Balance and arity findings for every mapped rule.
    pub fn lint(&self) -> Vec<LintFinding> {
        let mut findings = Vec::new();
        for compiled in &self.rules {
            let (Some(text), Some(expr)) = (&compiled.rule.expression, &compiled.expr) else {
                continue;
            };
            let finding = |problem: ExpressionError| LintFinding {
                table: self.table.clone(),
                attribute: compiled.rule.attribute.clone(),
                expression: text.clone(),
                problem,
            };
            if let Err(problem) = check_balance(text) {
                findings.push(finding(problem));
            }
            for (_, error) in expr.malformed() {
                findings.push(finding(error.clone()));
            }
        }
        findings
    }
}

/// All destination tables, in processing order.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    tables: Vec<CompiledTable>,
    findings: Vec<LintFinding>,
}

impl MappingSet {
    /// Compile mapping tables, reporting lint findings as warnings.
    ///
    /// # Errors
    ///
    /// With `strict_expressions`, the first unbalanced expression fails the
    /// whole set. A table without any rule always fails.
    pub fn compile(tables: Vec<MappingTable>, options: CompileOptions) -> Result<Self, MappingError> {
        let mut compiled_tables = Vec::with_capacity(tables.len());
        let mut findings = Vec::new();
        for table in tables {
            if table.rules.is_empty() {
                return Err(MappingError::EmptyTable(table.table));
            }
            let compiled = CompiledTable::compile(table);
            for finding in compiled.lint() {
                if options.strict_expressions
                    && matches!(finding.problem, ExpressionError::UnbalancedParentheses { .. })
                {
                    return Err(MappingError::Expression {
                        table: finding.table,
                        attribute: finding.attribute,
                        expression: finding.expression,
                        source: finding.problem,
                    });
                }
                warn!(
                    table = %finding.table,
                    attribute = %finding.attribute,
                    expression = %finding.expression,
                    problem = %finding.problem,
                    "mapping expression problem"
                );
                findings.push(finding);
            }
            debug!(
                table = %compiled.table,
                rules = compiled.rules.len(),
                active_rules = compiled.active_rules().count(),
                fields = compiled.referenced_fields().len(),
                mult_field = compiled.mult_field().unwrap_or("-"),
                "mapping table compiled"
            );
            compiled_tables.push(compiled);
        }
        Ok(Self {
            tables: compiled_tables,
            findings,
        })
    }

    pub fn tables(&self) -> &[CompiledTable] {
        &self.tables
    }

    pub fn findings(&self) -> &[LintFinding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
