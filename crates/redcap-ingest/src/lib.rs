#![deny(unsafe_code)]

//! Input side of the converter: the flat REDCap export and the mapping
//! tables that describe the destination schema.

pub mod error;
pub mod export;
pub mod mapping_tables;
pub mod sanitize;

pub use error::{IngestError, Result};
pub use export::{
    FIELD_NAME_COLUMN, IngestOptions, REPEAT_INSTANCE_COLUMN, VALUE_COLUMN, partition_patients,
    read_export, read_export_from_reader,
};
pub use mapping_tables::{list_mapping_files, load_mapping_tables, read_mapping_table};
pub use sanitize::sanitize_value;
