use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid patient identifier: {0:?}")]
    InvalidPatientId(String),
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
    #[error("invalid attribute name in table {table}: {attribute:?}")]
    InvalidAttribute { table: String, attribute: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
