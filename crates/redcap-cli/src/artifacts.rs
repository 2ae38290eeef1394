//! Per-patient output files.
//!
//! Each patient gets `<data>/Patients/Patient-<id>/` holding the SQL script
//! and a log of the diagnostics raised while building it. Only the worker
//! that owns the patient writes there.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use redcap_model::PatientId;
use redcap_transform::PatientOutput;

pub const PATIENTS_DIR: &str = "Patients";
pub const RUN_SUMMARY_FILE: &str = "run-summary.json";

/// Locations of one patient's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientArtifacts {
    pub dir: PathBuf,
    pub sql: PathBuf,
    pub log: PathBuf,
}

impl PatientArtifacts {
    pub fn new(data_path: &Path, patient_id: &PatientId) -> Self {
        let stem = patient_id.artifact_stem();
        let dir = data_path.join(PATIENTS_DIR).join(&stem);
        Self {
            sql: dir.join(format!("{stem}.sql")),
            log: dir.join(format!("{stem}.log")),
            dir,
        }
    }
}

/// Write the SQL script and the diagnostic log of one patient.
///
/// Both files are truncated, so a rerun replaces earlier output.
pub fn write_patient_artifacts(
    data_path: &Path,
    output: &PatientOutput,
    finished_at: DateTime<Utc>,
) -> Result<PatientArtifacts> {
    let artifacts = PatientArtifacts::new(data_path, &output.patient_id);
    fs::create_dir_all(&artifacts.dir)
        .with_context(|| format!("create {}", artifacts.dir.display()))?;
    fs::write(&artifacts.sql, output.render_sql())
        .with_context(|| format!("write {}", artifacts.sql.display()))?;
    fs::write(&artifacts.log, render_patient_log(output, finished_at))
        .with_context(|| format!("write {}", artifacts.log.display()))?;
    Ok(artifacts)
}

/// One line per diagnostic, preceded by a header and followed by totals.
pub fn render_patient_log(output: &PatientOutput, finished_at: DateTime<Utc>) -> String {
    let timestamp = finished_at.format("%Y-%m-%d %H:%M:%S");
    let mut log = format!("{timestamp} INFO  PATIENT {}\n", output.patient_id);
    for diagnostic in &output.diagnostics {
        log.push_str(&format!("{timestamp} {diagnostic}\n"));
    }
    log.push_str(&format!(
        "{timestamp} INFO  statements={} discarded={} lookup_misses={} malformed={}\n",
        output.statements.len(),
        output.stats.discarded(),
        output.stats.lookup_misses,
        output.stats.malformed_expressions
    ));
    log
}

pub fn run_summary_path(data_path: &Path) -> PathBuf {
    data_path.join(RUN_SUMMARY_FILE)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use redcap_model::{Diagnostic, DiagnosticKind, PatientId, TransformStats};

    use super::*;

    #[test]
    fn patient_log_has_header_diagnostics_and_totals() {
        let mut stats = TransformStats::default();
        stats.observe("demographics", DiagnosticKind::LookupMiss);
        stats.observe("demographics", DiagnosticKind::NotNullViolation);
        let output = PatientOutput {
            patient_id: PatientId::new("7").unwrap(),
            entities: Vec::new(),
            statements: Vec::new(),
            diagnostics: vec![
                Diagnostic::new(DiagnosticKind::LookupMiss, "race not found")
                    .with_table("demographics")
                    .with_attribute("race_code"),
            ],
            stats,
        };
        let finished_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

        let log = render_patient_log(&output, finished_at);

        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "2024-03-01 09:30:00 INFO  PATIENT 7");
        assert!(lines[1].starts_with("2024-03-01 09:30:00 WARN  lookup_miss"));
        assert!(lines[1].ends_with("race not found"));
        assert_eq!(
            lines[2],
            "2024-03-01 09:30:00 INFO  statements=0 discarded=1 lookup_misses=1 malformed=0"
        );
        assert!(log.ends_with('\n'));
    }
}
