use std::path::PathBuf;

use redcap_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no {column} column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}: line {line} has no patient identifier")]
    MissingPatientId { path: PathBuf, line: u64 },

    #[error("{path}: line {line} has invalid repeat instance {value:?}")]
    InvalidRepeatInstance {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("{path}: rows for table {found} in a mapping file for {expected}")]
    MixedTables {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("mapping folder not found: {path}")]
    MappingFolderNotFound { path: PathBuf },

    #[error("mapping file {path} has no rows")]
    EmptyMappingFile { path: PathBuf },
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
