//! Tests for redcap-model types.

use redcap_model::{
    DiagnosticKind, EntityInstance, MappingRule, ModelError, PatientId, TransformStats, Value,
};

#[test]
fn patient_id_is_trimmed_and_rejects_blank() {
    let id = PatientId::new("  7 ").expect("valid id");
    assert_eq!(id.as_str(), "7");
    assert_eq!(id.artifact_stem(), "Patient-7");
    assert!(matches!(
        PatientId::new("   "),
        Err(ModelError::InvalidPatientId(_))
    ));
}

#[test]
fn artifact_stem_encodes_path_separators() {
    let id = PatientId::new("site/01").expect("valid id");
    assert_eq!(id.artifact_stem(), "Patient-site%2F01");
}

#[test]
fn artifact_stems_of_distinct_ids_differ() {
    let stem = |raw: &str| PatientId::new(raw).expect("valid id").artifact_stem();
    assert_eq!(stem("A_1"), "Patient-A_1");
    assert_eq!(stem("A.1"), "Patient-A%2E1");
    assert_ne!(stem("ABC 01"), stem("ABC_01"));
    assert_ne!(stem("A%2E1"), stem("A.1"));
    assert_eq!(stem("é"), "Patient-%C3%A9");
}

#[test]
fn mapping_rule_drops_blank_expression() {
    let rule = MappingRule::new("demographics", "race_code", true, Some("  ".to_string()))
        .expect("valid rule");
    assert!(rule.expression.is_none());
    assert!(rule.not_null);

    let rule = MappingRule::new(" demographics ", " dob ", false, Some(" dob ".to_string()))
        .expect("valid rule");
    assert_eq!(rule.table, "demographics");
    assert_eq!(rule.attribute, "dob");
    assert_eq!(rule.expression.as_deref(), Some("dob"));
}

#[test]
fn mapping_rule_requires_names() {
    assert!(matches!(
        MappingRule::new("", "id", false, None),
        Err(ModelError::InvalidTableName(_))
    ));
    assert!(matches!(
        MappingRule::new("demographics", " ", false, None),
        Err(ModelError::InvalidAttribute { .. })
    ));
}

#[test]
fn sentinels_are_text_only() {
    assert!(Value::null().is_null_sentinel());
    assert!(Value::text("DROP").is_drop_sentinel());
    assert!(!Value::SubSelect("NULL".to_string()).is_null_sentinel());
    assert!(!Value::List(vec!["DROP".to_string()]).is_drop_sentinel());
    assert_eq!(Value::List(vec!["a".into(), "b".into()]).to_string(), "a, b");
}

#[test]
fn entity_keeps_attribute_order() {
    let mut entity = EntityInstance::new("demographics");
    entity.push("id", Value::text("42"));
    entity.push("name", Value::text("O`Brien"));
    let names: Vec<&str> = entity.values.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["id", "name"]);
    assert_eq!(entity.get("name"), Some(&Value::text("O`Brien")));
}

#[test]
fn stats_merge_across_patients() {
    let mut first = TransformStats::default();
    first.record_emitted("visits");
    first.observe("visits", DiagnosticKind::MalformedExpression);

    let mut second = TransformStats::default();
    second.record_emitted("visits");
    second.observe("visits", DiagnosticKind::EmptyInstance);
    second.observe("labs", DiagnosticKind::EmptySubset);

    first.merge(&second);
    assert_eq!(first.tables["visits"].emitted, 2);
    assert_eq!(first.tables["visits"].empty_discarded, 1);
    assert_eq!(first.malformed_expressions, 1);
    assert_eq!(first.skipped_tables, 1);
}
