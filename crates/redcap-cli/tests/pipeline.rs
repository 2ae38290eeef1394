//! Integration tests for the transform run.

use std::fs;
use std::path::Path;

use redcap_cli::artifacts::{PatientArtifacts, RUN_SUMMARY_FILE};
use redcap_cli::config::{ConfigOverrides, ResolvedConfig, RunConfig};
use redcap_cli::pipeline::{RunOptions, run_transform};
use redcap_model::PatientId;

const EXPORT: &str = "\
record_id,redcap_repeat_instrument,redcap_repeat_instance,field_name,value
7,,,race,White
7,,,dob,2000-01-01
7,visits,1,visit_date,2021-01-01
7,visits,2,visit_date,2021-02-01
8,,,dob,1990-05-05
";

const HEADER: &str = "Table,Attribute,NotNull,field_name\n";

fn fixture(root: &Path) -> ResolvedConfig {
    let mappings = root.join("mappings");
    fs::create_dir_all(&mappings).unwrap();
    fs::write(
        mappings.join("0-0-demographics.csv"),
        format!("{HEADER}demographics,id,,AUTO\ndemographics,race_code,NOT NULL,race\n"),
    )
    .unwrap();
    fs::write(
        mappings.join("1-0-visit.csv"),
        format!(
            "{HEADER}visit,id,,AUTO\n\
             visit,person_id,NOT NULL,\"SRCH(id, demographics, race_code, GLOB(race))\"\n\
             visit,visit_date,NOT NULL,visit_date\n"
        ),
    )
    .unwrap();
    let export = root.join("export.csv");
    fs::write(&export, EXPORT).unwrap();
    RunConfig {
        extraction_path: Some(export),
        mapping_path: Some(mappings),
        data_path: root.join("data"),
        workers: 2,
        ..RunConfig::default()
    }
    .resolve()
    .unwrap()
}

#[test]
fn writes_one_script_per_patient() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());

    let report = run_transform(&config, RunOptions::default()).unwrap();

    assert_eq!(report.patients.len(), 2);
    assert!(!report.has_failures());
    assert_eq!(report.tables, ["demographics", "visit"]);

    let seven = PatientArtifacts::new(&config.data_path, &PatientId::new("7").unwrap());
    let script = fs::read_to_string(&seven.sql).unwrap();
    insta::assert_snapshot!(script, @r"
    -- Patient: 7
    INSERT OR IGNORE INTO demographics (race_code) VALUES ('White');
    INSERT OR IGNORE INTO visit (person_id, visit_date) VALUES ((SELECT id FROM demographics WHERE race_code = 'White'), '2021-01-01');
    INSERT OR IGNORE INTO visit (person_id, visit_date) VALUES ((SELECT id FROM demographics WHERE race_code = 'White'), '2021-02-01');
    ");
    assert!(seven.log.exists());

    let eight = PatientArtifacts::new(&config.data_path, &PatientId::new("8").unwrap());
    assert_eq!(fs::read_to_string(&eight.sql).unwrap(), "-- Patient: 8\n");
    let log = fs::read_to_string(&eight.log).unwrap();
    assert!(log.contains("PATIENT 8"));
    assert!(log.contains("empty_subset"));
}

#[test]
fn run_summary_is_written_next_to_patients() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());

    let report = run_transform(&config, RunOptions::default()).unwrap();

    let path = config.data_path.join(RUN_SUMMARY_FILE);
    assert_eq!(report.summary_path.as_deref(), Some(path.as_path()));
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(summary["patients"].as_array().map(Vec::len), Some(2));
    assert_eq!(summary["stats"]["tables"]["visit"]["emitted"], 2);
    assert_eq!(summary["stats"]["tables"]["demographics"]["emitted"], 1);
    assert_eq!(summary["dry_run"], false);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());

    let report = run_transform(
        &config,
        RunOptions {
            dry_run: true,
            progress: false,
        },
    )
    .unwrap();

    assert_eq!(report.statements(), 3);
    assert!(report.summary_path.is_none());
    assert!(!config.data_path.exists());
}

#[test]
fn unwritable_patient_folder_fails_patients_not_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    fs::create_dir_all(&config.data_path).unwrap();
    fs::write(config.data_path.join("Patients"), "not a directory").unwrap();

    let report = run_transform(&config, RunOptions::default()).unwrap();

    assert_eq!(report.failures(), 2);
    assert!(report.patients.iter().all(|patient| patient.sql_path.is_none()));
    assert_eq!(report.statements(), 3);
    assert!(config.data_path.join(RUN_SUMMARY_FILE).exists());
}

#[test]
fn blocked_patient_fails_alone() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let eight = PatientArtifacts::new(&config.data_path, &PatientId::new("8").unwrap());
    fs::create_dir_all(eight.dir.parent().unwrap()).unwrap();
    fs::write(&eight.dir, "not a directory").unwrap();

    let report = run_transform(&config, RunOptions::default()).unwrap();

    assert_eq!(report.failures(), 1);
    assert!(report.has_failures());
    let failed: Vec<&str> = report
        .patients
        .iter()
        .filter(|patient| patient.failed())
        .map(|patient| patient.patient_id.as_str())
        .collect();
    assert_eq!(failed, ["8"]);

    let seven = PatientArtifacts::new(&config.data_path, &PatientId::new("7").unwrap());
    assert_eq!(report.patients[0].sql_path.as_deref(), Some(seven.sql.as_path()));
    let script = fs::read_to_string(&seven.sql).unwrap();
    assert_eq!(script.lines().count(), 4);
    assert!(config.data_path.join(RUN_SUMMARY_FILE).exists());
}

#[test]
fn punctuation_variants_get_their_own_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    fs::write(
        &config.extraction_path,
        "record_id,field_name,value\nA.1,race,White\nA_1,race,Black\n",
    )
    .unwrap();

    let report = run_transform(&config, RunOptions::default()).unwrap();

    assert!(!report.has_failures());
    let dotted = PatientArtifacts::new(&config.data_path, &PatientId::new("A.1").unwrap());
    let underscored = PatientArtifacts::new(&config.data_path, &PatientId::new("A_1").unwrap());
    assert_ne!(dotted.dir, underscored.dir);
    insta::assert_snapshot!(fs::read_to_string(&dotted.sql).unwrap(), @r"
    -- Patient: A.1
    INSERT OR IGNORE INTO demographics (race_code) VALUES ('White');
    ");
    insta::assert_snapshot!(fs::read_to_string(&underscored.sql).unwrap(), @r"
    -- Patient: A_1
    INSERT OR IGNORE INTO demographics (race_code) VALUES ('Black');
    ");
}

#[test]
fn case_variants_are_refused_instead_of_merged() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    fs::write(
        &config.extraction_path,
        "record_id,field_name,value\nab,race,White\nAB,race,Black\n7,race,Other\n",
    )
    .unwrap();

    let report = run_transform(&config, RunOptions::default()).unwrap();

    assert_eq!(report.failures(), 2);
    assert!(report.patients[..2].iter().all(|patient| patient.sql_path.is_none()));
    let lower = PatientArtifacts::new(&config.data_path, &PatientId::new("ab").unwrap());
    assert!(!lower.dir.exists());
    assert!(report.patients[2].sql_path.is_some());
}

#[test]
fn missing_mapping_folder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        extraction_path: Some(dir.path().join("export.csv")),
        mapping_path: Some(dir.path().join("nowhere")),
        data_path: dir.path().join("data"),
        ..RunConfig::default()
    }
    .resolve()
    .unwrap();

    let error = run_transform(&config, RunOptions::default()).unwrap_err();

    assert!(format!("{error:#}").contains("nowhere"));
}

#[test]
fn config_file_and_flags_combine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"extraction_path": "export.csv", "mapping_path": "maps", "data_path": "out", "workers": 4}"#,
    )
    .unwrap();

    let config = RunConfig::load(&path)
        .unwrap()
        .apply(ConfigOverrides {
            workers: Some(1),
            strict_expressions: true,
            ..ConfigOverrides::default()
        })
        .resolve()
        .unwrap();

    assert_eq!(config.workers, 1);
    assert_eq!(config.data_path, Path::new("out"));
    assert!(config.strict_expressions);
    assert!(config.sanitize_values);
}

#[test]
fn toml_config_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("redcap-etl.toml");
    fs::write(
        &path,
        "extraction_path = \"export.csv\"\nmapping_path = \"maps\"\nsanitize_values = false\n",
    )
    .unwrap();

    let config = RunConfig::load(&path).unwrap();

    assert!(!config.sanitize_values);
    assert_eq!(config.workers, 8);
}
