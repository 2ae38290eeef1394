//! Record scopes used during evaluation.

use redcap_model::FieldRecord;

/// An ordered view over some of a patient's records.
///
/// The builder evaluates every expression against two scopes: the records of
/// the current instance and the whole patient.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    records: Vec<&'a FieldRecord>,
}

impl<'a> Scope<'a> {
    pub fn new(records: impl IntoIterator<Item = &'a FieldRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// Value of the first record named `field`.
    pub fn first(&self, field: &str) -> Option<&'a str> {
        self.records
            .iter()
            .find(|record| record.field_name == field)
            .map(|record| record.value.as_str())
    }

    /// Values of every record named `field`, in record order.
    pub fn all(&self, field: &str) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.field_name == field)
            .map(|record| record.value.clone())
            .collect()
    }
}
