#![deny(unsafe_code)]

use std::fmt;

use crate::ModelError;

/// Identifier shared by every record of one patient.
///
/// Taken verbatim (trimmed) from the first column of the export.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidPatientId(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Folder and file stem used for the patient's artifacts.
    ///
    /// Bytes outside `[A-Za-z0-9_-]` are percent-encoded, so distinct
    /// identifiers never share a stem.
    pub fn artifact_stem(&self) -> String {
        let mut stem = String::with_capacity(self.0.len() + 8);
        stem.push_str("Patient-");
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                stem.push(char::from(byte));
            } else {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
        stem
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
