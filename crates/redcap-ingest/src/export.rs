//! Reading the flat attribute/value export.
//!
//! The export has one row per observation. The first column identifies the
//! patient (usually `record_id`); `field_name` and `value` are required and
//! `redcap_repeat_instance` is optional.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use redcap_model::{FieldRecord, PatientId, PatientRecords};

use crate::error::{IngestError, Result};
use crate::sanitize::sanitize_value;

pub const FIELD_NAME_COLUMN: &str = "field_name";
pub const VALUE_COLUMN: &str = "value";
pub const REPEAT_INSTANCE_COLUMN: &str = "redcap_repeat_instance";

/// Options for reading an export.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Apply [`sanitize_value`] to every value.
    pub sanitize: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { sanitize: true }
    }
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct ExportColumns {
    patient: usize,
    field_name: usize,
    value: usize,
    repeat_instance: Option<usize>,
}

impl ExportColumns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|header| normalize_header(header).eq_ignore_ascii_case(name))
        };
        if headers.is_empty() {
            return Err(IngestError::MissingColumn {
                path: path.to_path_buf(),
                column: "patient identifier",
            });
        }
        let field_name = position(FIELD_NAME_COLUMN).ok_or_else(|| IngestError::MissingColumn {
            path: path.to_path_buf(),
            column: FIELD_NAME_COLUMN,
        })?;
        let value = position(VALUE_COLUMN).ok_or_else(|| IngestError::MissingColumn {
            path: path.to_path_buf(),
            column: VALUE_COLUMN,
        })?;
        Ok(Self {
            patient: 0,
            field_name,
            value,
            repeat_instance: position(REPEAT_INSTANCE_COLUMN),
        })
    }
}

fn normalize_header(raw: &str) -> &str {
    raw.trim().trim_matches('\u{feff}')
}

/// Read an export file and group it by patient.
pub fn read_export(path: &Path, options: IngestOptions) -> Result<Vec<PatientRecords>> {
    let file = File::open(path).map_err(|source| IngestError::io(path, source))?;
    read_export_from_reader(file, path, options)
}

/// Read an export from any reader; `source` names it in errors.
pub fn read_export_from_reader<R: Read>(
    reader: R,
    source: &Path,
    options: IngestOptions,
) -> Result<Vec<PatientRecords>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|error| IngestError::csv(source, error))?
        .clone();
    let columns = ExportColumns::resolve(&headers, source)?;
    debug!(
        source = %source.display(),
        patient_column = normalize_header(headers.get(columns.patient).unwrap_or_default()),
        has_repeats = columns.repeat_instance.is_some(),
        "export columns resolved"
    );

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| IngestError::csv(source, error))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);
        let patient = record.get(columns.patient).unwrap_or_default();
        let patient_id = PatientId::new(patient).map_err(|_| IngestError::MissingPatientId {
            path: source.to_path_buf(),
            line,
        })?;
        let field_name = record.get(columns.field_name).unwrap_or_default().trim();
        let raw_value = record.get(columns.value).unwrap_or_default();
        let value = if options.sanitize {
            sanitize_value(raw_value)
        } else {
            raw_value.to_string()
        };
        let repeat_instance = match columns.repeat_instance {
            Some(idx) => parse_repeat_instance(record.get(idx).unwrap_or_default()).ok_or_else(
                || IngestError::InvalidRepeatInstance {
                    path: source.to_path_buf(),
                    line,
                    value: record.get(idx).unwrap_or_default().to_string(),
                },
            )?,
            None => None,
        };
        rows.push((
            patient_id,
            FieldRecord {
                field_name: field_name.to_string(),
                value,
                repeat_instance,
            },
        ));
    }

    let patients = partition_patients(rows);
    info!(
        source = %source.display(),
        patients = patients.len(),
        records = patients.iter().map(PatientRecords::len).sum::<usize>(),
        "export read"
    );
    Ok(patients)
}

/// Parse a repeat instance cell.
///
/// Empty means "not repeated". Exports written through a float column carry a
/// `.0` suffix, which is accepted. Returns `None` for anything else.
fn parse_repeat_instance(raw: &str) -> Option<Option<u32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(None);
    }
    if let Ok(value) = trimmed.parse::<u32>() {
        return Some(Some(value));
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        return Some(Some(value as u32));
    }
    None
}

/// Group records by patient, keeping first-seen patient order and record order.
pub fn partition_patients<I>(rows: I) -> Vec<PatientRecords>
where
    I: IntoIterator<Item = (PatientId, FieldRecord)>,
{
    let mut index: HashMap<PatientId, usize> = HashMap::new();
    let mut patients: Vec<PatientRecords> = Vec::new();
    for (patient_id, record) in rows {
        match index.get(&patient_id) {
            Some(&position) => patients[position].records.push(record),
            None => {
                index.insert(patient_id.clone(), patients.len());
                patients.push(PatientRecords::new(patient_id, vec![record]));
            }
        }
    }
    patients
}
