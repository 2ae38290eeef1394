//! Core data types shared by the REDCap to SQL converter crates.

pub mod diagnostic;
pub mod entity;
pub mod error;
pub mod ids;
pub mod mapping;
pub mod record;
pub mod value;

pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticLevel, TableStats, TransformStats};
pub use entity::EntityInstance;
pub use error::{ModelError, Result};
pub use ids::PatientId;
pub use mapping::{MappingRule, MappingTable};
pub use record::{FieldRecord, PatientRecords};
pub use value::{DROP_SENTINEL, NULL_SENTINEL, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_discards_per_table() {
        let mut stats = TransformStats::default();
        stats.record_emitted("demographics");
        stats.observe("demographics", DiagnosticKind::NotNullViolation);
        stats.observe("visits", DiagnosticKind::DropRequested);
        stats.observe("visits", DiagnosticKind::LookupMiss);
        assert_eq!(stats.emitted(), 1);
        assert_eq!(stats.discarded(), 2);
        assert_eq!(stats.lookup_misses, 1);
        assert_eq!(stats.tables["visits"].drop_discarded, 1);
    }

    #[test]
    fn value_serializes_tagged() {
        let json = serde_json::to_string(&Value::SubSelect("(SELECT 1)".to_string()))
            .expect("serialize value");
        assert_eq!(json, r#"{"kind":"SubSelect","value":"(SELECT 1)"}"#);
    }
}
