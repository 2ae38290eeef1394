//! Transform run with explicit stages.
//!
//! 1. **Mappings**: load and compile every mapping table
//! 2. **Ingest**: read the export and partition it by patient
//! 3. **Transform**: run patients on a fixed-size worker pool
//! 4. **Output**: per-patient artifacts and `run-summary.json`
//!
//! A patient that fails (artifact I/O or a panic in the transform) is
//! recorded and the run continues with the others.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, info_span, trace};

use redcap_ingest::{IngestOptions, load_mapping_tables, read_export};
use redcap_map::{CompileOptions, MappingSet};
use redcap_model::{PatientId, PatientRecords, TransformStats};
use redcap_transform::{PatientOutput, transform_patient};

use crate::artifacts::{run_summary_path, write_patient_artifacts};
use crate::config::ResolvedConfig;
use crate::logging::redact_value;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Transform everything but write no files.
    pub dry_run: bool,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

/// Outcome of one patient.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub patient_id: PatientId,
    pub records: usize,
    pub statements: usize,
    pub diagnostics: usize,
    pub sql_path: Option<PathBuf>,
    pub error: Option<String>,
    #[serde(skip)]
    pub stats: TransformStats,
}

impl PatientSummary {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// RFC 3339 timestamps.
    pub started_at: String,
    pub finished_at: String,
    pub extraction_path: PathBuf,
    pub mapping_path: PathBuf,
    pub data_path: PathBuf,
    pub workers: usize,
    pub dry_run: bool,
    pub tables: Vec<String>,
    pub lint_findings: usize,
    pub patients: Vec<PatientSummary>,
    pub stats: TransformStats,
    pub summary_path: Option<PathBuf>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.patients.iter().filter(|patient| patient.failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    pub fn statements(&self) -> usize {
        self.patients.iter().map(|patient| patient.statements).sum()
    }
}

/// Load and compile the mapping tables of a folder.
pub fn load_mapping_set(dir: &Path, strict_expressions: bool) -> Result<MappingSet> {
    let tables = load_mapping_tables(dir)
        .with_context(|| format!("load mapping tables from {}", dir.display()))?;
    MappingSet::compile(tables, CompileOptions { strict_expressions })
        .with_context(|| format!("compile mapping tables from {}", dir.display()))
}

pub fn run_transform(config: &ResolvedConfig, options: RunOptions) -> Result<RunReport> {
    let run_span = info_span!(
        "run",
        extraction = %config.extraction_path.display(),
        mappings = %config.mapping_path.display(),
        workers = config.workers,
        dry_run = options.dry_run,
    );
    let _run_guard = run_span.enter();
    let started_at = Utc::now();
    let start = Instant::now();

    let mappings = load_mapping_set(&config.mapping_path, config.strict_expressions)?;
    info!(
        tables = mappings.len(),
        findings = mappings.findings().len(),
        "mapping tables compiled"
    );

    let ingest = IngestOptions {
        sanitize: config.sanitize_values,
    };
    let patients = read_export(&config.extraction_path, ingest)
        .with_context(|| format!("read export {}", config.extraction_path.display()))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|index| format!("redcap-worker-{index}"))
        .build()
        .context("build worker pool")?;

    let shared = shared_artifact_folders(&patients);
    let progress = progress_bar(patients.len(), options.progress);
    let summaries: Vec<PatientSummary> = pool.install(|| {
        patients
            .par_iter()
            .map(|patient| {
                let summary = run_span.in_scope(|| {
                    if shared.contains_key(&folded_stem(&patient.patient_id)) {
                        shared_folder_summary(patient, &shared)
                    } else {
                        process_patient(patient, &mappings, &config.data_path, options.dry_run)
                    }
                });
                progress.inc(1);
                summary
            })
            .collect()
    });
    progress.finish_and_clear();

    let mut stats = TransformStats::default();
    for summary in &summaries {
        stats.merge(&summary.stats);
    }

    let mut report = RunReport {
        started_at: started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
        extraction_path: config.extraction_path.clone(),
        mapping_path: config.mapping_path.clone(),
        data_path: config.data_path.clone(),
        workers: config.workers,
        dry_run: options.dry_run,
        tables: mappings.tables().iter().map(|table| table.table.clone()).collect(),
        lint_findings: mappings.findings().len(),
        patients: summaries,
        stats,
        summary_path: None,
    };
    if !options.dry_run {
        report.summary_path = Some(write_run_summary(&report)?);
    }

    info!(
        patients = report.patients.len(),
        failures = report.failures(),
        statements = report.statements(),
        discarded = report.stats.discarded(),
        duration_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(report)
}

/// Transform one patient and write its artifacts. Never aborts the run.
pub fn process_patient(
    patient: &PatientRecords,
    mappings: &MappingSet,
    data_path: &Path,
    dry_run: bool,
) -> PatientSummary {
    let mut summary = PatientSummary {
        patient_id: patient.patient_id.clone(),
        records: patient.len(),
        statements: 0,
        diagnostics: 0,
        sql_path: None,
        error: None,
        stats: TransformStats::default(),
    };

    let output = match isolate(|| transform_patient(patient, mappings)) {
        Ok(output) => output,
        Err(message) => {
            error!(patient_id = %patient.patient_id, error = %message, "patient transform panicked");
            summary.error = Some(message);
            return summary;
        }
    };
    log_statements(&output);
    summary.statements = output.statements.len();
    summary.diagnostics = output.diagnostics.len();

    if !dry_run {
        match write_patient_artifacts(data_path, &output, Utc::now()) {
            Ok(artifacts) => summary.sql_path = Some(artifacts.sql),
            Err(err) => {
                error!(patient_id = %patient.patient_id, error = %format!("{err:#}"), "patient artifacts not written");
                summary.error = Some(format!("{err:#}"));
            }
        }
    }
    summary.stats = output.stats;
    summary
}

/// Run `work`, turning a panic into an error message.
fn isolate<T>(work: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| panic_message(payload.as_ref()))
}

/// Artifact stem as a case-insensitive file system sees it.
fn folded_stem(patient_id: &PatientId) -> String {
    patient_id.artifact_stem().to_ascii_lowercase()
}

/// Folded stems claimed by more than one patient, with the claiming ids.
fn shared_artifact_folders(patients: &[PatientRecords]) -> HashMap<String, Vec<PatientId>> {
    let mut claims: HashMap<String, Vec<PatientId>> = HashMap::new();
    for patient in patients {
        claims
            .entry(folded_stem(&patient.patient_id))
            .or_default()
            .push(patient.patient_id.clone());
    }
    claims.retain(|_, ids| ids.len() > 1);
    claims
}

fn shared_folder_summary(
    patient: &PatientRecords,
    shared: &HashMap<String, Vec<PatientId>>,
) -> PatientSummary {
    let others: Vec<String> = shared
        .get(&folded_stem(&patient.patient_id))
        .into_iter()
        .flatten()
        .filter(|id| **id != patient.patient_id)
        .map(ToString::to_string)
        .collect();
    let message = format!(
        "artifact folder {} is shared with patient(s) {}",
        patient.patient_id.artifact_stem(),
        others.join(", ")
    );
    error!(patient_id = %patient.patient_id, error = %message, "patient skipped");
    PatientSummary {
        patient_id: patient.patient_id.clone(),
        records: patient.len(),
        statements: 0,
        diagnostics: 0,
        sql_path: None,
        error: Some(message),
        stats: TransformStats::default(),
    }
}

fn log_statements(output: &PatientOutput) {
    for statement in &output.statements {
        trace!(
            patient_id = %output.patient_id,
            statement = redact_value(statement),
            "statement generated"
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return format!("transform panicked: {message}");
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return format!("transform panicked: {message}");
    }
    "transform panicked".to_string()
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} patients {pos}/{len} [{bar:40}] {elapsed_precise}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Write `run-summary.json` next to the patient folders.
pub fn write_run_summary(report: &RunReport) -> Result<PathBuf> {
    let path = run_summary_path(&report.data_path);
    std::fs::create_dir_all(&report.data_path)
        .with_context(|| format!("create {}", report.data_path.display()))?;
    let json = serde_json::to_string_pretty(report).context("serialize run summary")?;
    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
