use serde::{Deserialize, Serialize};

use crate::ids::PatientId;

/// One attribute observation for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub field_name: String,
    pub value: String,
    /// Position of the observation inside a repeating group, if any.
    pub repeat_instance: Option<u32>,
}

impl FieldRecord {
    pub fn new(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            value: value.into(),
            repeat_instance: None,
        }
    }

    pub fn repeated(field_name: impl Into<String>, value: impl Into<String>, instance: u32) -> Self {
        Self {
            field_name: field_name.into(),
            value: value.into(),
            repeat_instance: Some(instance),
        }
    }
}

/// All records of a single patient, in export order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecords {
    pub patient_id: PatientId,
    pub records: Vec<FieldRecord>,
}

impl PatientRecords {
    pub fn new(patient_id: PatientId, records: Vec<FieldRecord>) -> Self {
        Self {
            patient_id,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
