#![allow(dead_code)]

use redcap_map::{CompileOptions, MappingSet};
use redcap_model::{FieldRecord, MappingRule, MappingTable, PatientId, PatientRecords};

/// `(attribute, not_null, expression)`; an empty expression means unmapped.
pub fn table(name: &str, rules: &[(&str, bool, &str)]) -> MappingTable {
    MappingTable {
        table: name.to_string(),
        rules: rules
            .iter()
            .map(|(attribute, not_null, expression)| {
                let expression = (!expression.is_empty()).then(|| (*expression).to_string());
                MappingRule::new(name, *attribute, *not_null, expression).unwrap()
            })
            .collect(),
    }
}

pub fn mappings(tables: Vec<MappingTable>) -> MappingSet {
    MappingSet::compile(tables, CompileOptions::default()).unwrap()
}

pub fn patient(id: &str, records: Vec<FieldRecord>) -> PatientRecords {
    PatientRecords::new(PatientId::new(id).unwrap(), records)
}
