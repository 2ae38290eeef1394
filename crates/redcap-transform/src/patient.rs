//! Per-patient transform driver.

use serde::Serialize;
use tracing::{debug, debug_span, info, info_span};

use redcap_map::MappingSet;
use redcap_model::{Diagnostic, EntityInstance, PatientId, PatientRecords, TransformStats};

use crate::builder::{DiagnosticSink, build_entities};
use crate::sql::insert_statement;

/// Everything produced for one patient.
#[derive(Debug, Clone, Serialize)]
pub struct PatientOutput {
    pub patient_id: PatientId,
    /// Emitted instances in mapping-table order.
    pub entities: Vec<EntityInstance>,
    /// One `INSERT OR IGNORE` per entity, same order as `entities`.
    pub statements: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TransformStats,
}

impl PatientOutput {
    /// Contents of the patient's SQL artifact.
    pub fn render_sql(&self) -> String {
        let mut script = format!("-- Patient: {}\n", self.patient_id);
        for statement in &self.statements {
            script.push_str(statement);
            script.push('\n');
        }
        script
    }
}

/// Run every mapping table against one patient.
///
/// Never fails: problems are contained per attribute or instance and reported
/// as diagnostics.
pub fn transform_patient(patient: &PatientRecords, mappings: &MappingSet) -> PatientOutput {
    let span = info_span!("patient", patient_id = %patient.patient_id);
    let _guard = span.enter();

    let mut sink = DiagnosticSink::default();
    let mut entities = Vec::new();
    for table in mappings.tables() {
        let table_span = debug_span!("table", table = %table.table);
        let _table_guard = table_span.enter();
        let built = build_entities(table, &patient.records, &mut sink);
        debug!(instances = built.len(), "table processed");
        entities.extend(built);
    }
    let statements: Vec<String> = entities
        .iter()
        .map(|entity| insert_statement(&entity.table, &entity.values))
        .collect();

    info!(
        records = patient.len(),
        statements = statements.len(),
        discarded = sink.stats.discarded(),
        lookup_misses = sink.stats.lookup_misses,
        "patient transformed"
    );
    PatientOutput {
        patient_id: patient.patient_id.clone(),
        entities,
        statements,
        diagnostics: sink.diagnostics,
        stats: sink.stats,
    }
}
