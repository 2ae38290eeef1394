use std::fs;

use redcap_cli::scaffold::{parse_schema, scaffold, write_mapping_templates};
use redcap_ingest::load_mapping_tables;

const SCHEMA: &str = "\
CREATE TABLE demographics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    race_code TEXT NOT NULL,
    birth_date TEXT
);
CREATE TABLE visit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id INTEGER NOT NULL,
    visit_date TEXT NOT NULL
);
";

#[test]
fn templates_are_numbered_in_schema_order() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.sql");
    fs::write(&schema, SCHEMA).unwrap();
    let out = dir.path().join("mappings");

    let written = scaffold(&schema, &out).unwrap();

    let names: Vec<_> = written
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["0-0-demographics.csv", "1-0-visit.csv"]);
    insta::assert_snapshot!(fs::read_to_string(&written[0]).unwrap(), @r"
    Table,Attribute,NotNull,field_name
    demographics,id,,
    demographics,race_code,NOT NULL,
    demographics,birth_date,,
    ");
}

#[test]
fn templates_load_as_unmapped_tables() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mappings");
    let tables = parse_schema(SCHEMA).unwrap();
    write_mapping_templates(&tables, &out).unwrap();

    let loaded = load_mapping_tables(&out).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].table, "visit");
    assert!(loaded[1].rules.iter().all(|rule| rule.expression.is_none()));
    assert!(loaded[1].rules[1].not_null);
    assert!(!loaded[1].rules[0].not_null);
}

#[test]
fn refuses_non_empty_folder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mappings");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("0-0-existing.csv"), "keep me").unwrap();
    let tables = parse_schema(SCHEMA).unwrap();

    let error = write_mapping_templates(&tables, &out).unwrap_err();

    assert!(error.to_string().contains("not empty"));
    assert_eq!(fs::read_to_string(out.join("0-0-existing.csv")).unwrap(), "keep me");
}

#[test]
fn schema_without_tables_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.sql");
    fs::write(&schema, "CREATE INDEX idx ON t (a);").unwrap();

    assert!(scaffold(&schema, &dir.path().join("out")).is_err());
}
