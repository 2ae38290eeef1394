//! Entity instances built from one patient for one mapping table.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use redcap_map::{CompiledRule, CompiledTable};
use redcap_model::{
    Diagnostic, DiagnosticKind, DiagnosticLevel, EntityInstance, FieldRecord, TransformStats, Value,
};

use crate::evaluator::Evaluator;
use crate::scope::Scope;

/// Collects diagnostics and counters while a patient is transformed.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TransformStats,
}

impl DiagnosticSink {
    pub fn raise(&mut self, table: &str, diagnostic: Diagnostic) {
        let diagnostic = if diagnostic.table.is_none() {
            diagnostic.with_table(table)
        } else {
            diagnostic
        };
        let kind = diagnostic.kind.as_str();
        let attribute = diagnostic.attribute.as_deref().unwrap_or("-");
        match diagnostic.level {
            DiagnosticLevel::Error => {
                error!(kind, table, attribute, detail = %diagnostic.message, "transform diagnostic");
            }
            DiagnosticLevel::Warning => {
                warn!(kind, table, attribute, detail = %diagnostic.message, "transform diagnostic");
            }
            DiagnosticLevel::Info => {
                info!(kind, table, attribute, detail = %diagnostic.message, "transform diagnostic");
            }
            DiagnosticLevel::Debug => {
                debug!(kind, table, attribute, detail = %diagnostic.message, "transform diagnostic");
            }
        }
        self.stats.observe(table, diagnostic.kind);
        self.diagnostics.push(diagnostic);
    }

    fn emitted(&mut self, table: &str) {
        self.stats.record_emitted(table);
    }
}

/// Build every entity instance of `table` from one patient's records.
///
/// Rules without an expression or marked `AUTO` are ignored. Records are
/// grouped by repeat instance when any relevant record carries one, and a
/// `MULT` rule fans each group out into one instance per occurrence.
pub fn build_entities(
    table: &CompiledTable,
    records: &[FieldRecord],
    sink: &mut DiagnosticSink,
) -> Vec<EntityInstance> {
    let name = table.table.as_str();
    if !table.has_active_rules() {
        sink.raise(
            name,
            Diagnostic::new(
                DiagnosticKind::NoActiveRules,
                "no mapped attributes after removing unmapped and AUTO rules",
            ),
        );
        return Vec::new();
    }

    let fields = table.referenced_fields();
    let subset: Vec<&FieldRecord> = records
        .iter()
        .filter(|record| fields.contains(&record.field_name))
        .collect();
    if subset.is_empty() {
        sink.raise(
            name,
            Diagnostic::new(
                DiagnosticKind::EmptySubset,
                "patient has none of the fields referenced by the table",
            ),
        );
        return Vec::new();
    }

    let patient = Scope::new(records);
    let candidates = group_repeats(subset);
    debug!(table = name, candidates = candidates.len(), "candidate instances");

    let mut entities = Vec::new();
    for candidate in candidates {
        for instance in fan_out(name, candidate, table.mult_field(), sink) {
            let repeat = Scope::new(instance);
            if let Some(entity) = resolve_instance(table, &repeat, &patient, sink) {
                entities.push(entity);
            }
        }
    }
    entities
}

/// One candidate without repeats, else one per repeat instance in ascending
/// order. Records without an instance are left out once repeats exist.
fn group_repeats(subset: Vec<&FieldRecord>) -> Vec<Vec<&FieldRecord>> {
    if subset.iter().all(|record| record.repeat_instance.is_none()) {
        return vec![subset];
    }
    let mut groups: BTreeMap<u32, Vec<&FieldRecord>> = BTreeMap::new();
    for record in subset {
        if let Some(instance) = record.repeat_instance {
            groups.entry(instance).or_default().push(record);
        }
    }
    groups.into_values().collect()
}

/// Expand a candidate into one instance per occurrence of the `MULT` field.
///
/// Each derived instance keeps exactly one occurrence plus every other record.
fn fan_out<'a>(
    table: &str,
    candidate: Vec<&'a FieldRecord>,
    mult_field: Option<&str>,
    sink: &mut DiagnosticSink,
) -> Vec<Vec<&'a FieldRecord>> {
    let Some(field) = mult_field else {
        return vec![candidate];
    };
    let occurrences: Vec<usize> = candidate
        .iter()
        .enumerate()
        .filter(|(_, record)| record.field_name == field)
        .map(|(position, _)| position)
        .collect();
    if occurrences.is_empty() {
        sink.raise(
            table,
            Diagnostic::new(
                DiagnosticKind::NoMultOccurrence,
                format!("MULT field {field} has no occurrence in the instance"),
            ),
        );
        return Vec::new();
    }
    occurrences
        .iter()
        .map(|&kept| {
            candidate
                .iter()
                .enumerate()
                .filter(|(position, record)| *position == kept || record.field_name != field)
                .map(|(_, record)| *record)
                .collect()
        })
        .collect()
}

fn resolve_instance(
    table: &CompiledTable,
    repeat: &Scope<'_>,
    patient: &Scope<'_>,
    sink: &mut DiagnosticSink,
) -> Option<EntityInstance> {
    let name = table.table.as_str();
    let mut evaluator = Evaluator::new(repeat, patient);
    let mut resolved: Vec<(&CompiledRule, Option<Value>)> = Vec::new();
    for rule in table.active_rules() {
        let value = rule.expr.as_ref().and_then(|expr| evaluator.evaluate(expr));
        for diagnostic in evaluator.take_diagnostics() {
            sink.raise(name, diagnostic.with_attribute(rule.rule.attribute.as_str()));
        }
        resolved.push((rule, value));
    }

    let missing: Vec<&str> = resolved
        .iter()
        .filter(|(rule, value)| {
            rule.rule.not_null && value.as_ref().is_none_or(Value::is_null_sentinel)
        })
        .map(|(rule, _)| rule.rule.attribute.as_str())
        .collect();
    if !missing.is_empty() {
        sink.raise(
            name,
            Diagnostic::new(
                DiagnosticKind::NotNullViolation,
                format!("no value for NOT NULL attributes: {}", missing.join(", ")),
            ),
        );
        return None;
    }

    let mut entity = EntityInstance::new(name);
    for (rule, value) in resolved {
        match value {
            Some(value) if !value.is_null_sentinel() => {
                entity.push(rule.rule.attribute.as_str(), value);
            }
            _ => {}
        }
    }

    if let Some((attribute, _)) = entity.values.iter().find(|(_, value)| value.is_drop_sentinel()) {
        let diagnostic = Diagnostic::new(DiagnosticKind::DropRequested, "instance dropped")
            .with_attribute(attribute.as_str());
        sink.raise(name, diagnostic);
        return None;
    }

    if entity.is_empty() {
        sink.raise(
            name,
            Diagnostic::new(DiagnosticKind::EmptyInstance, "no attribute left after pruning"),
        );
        return None;
    }

    sink.emitted(name);
    Some(entity)
}
