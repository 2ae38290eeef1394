//! Discovery and loading of mapping-table CSV files.
//!
//! A mapping folder holds one CSV per destination table with the columns
//! `Table, Attribute, NotNull, field_name`. Files are taken in file-name
//! order, comparing a leading number numerically, which the scaffold makes
//! equal to the table creation order.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info_span};

use redcap_model::{MappingRule, MappingTable};

use crate::error::{IngestError, Result};

const NOT_NULL_MARKER: &str = "NOT NULL";

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(rename = "Table")]
    table: String,
    #[serde(rename = "Attribute")]
    attribute: String,
    #[serde(rename = "NotNull", default)]
    not_null: Option<String>,
    #[serde(rename = "field_name", default)]
    field_name: Option<String>,
}

impl MappingRow {
    fn is_blank(&self) -> bool {
        self.table.trim().is_empty() && self.attribute.trim().is_empty()
    }

    fn is_not_null(&self) -> bool {
        self.not_null
            .as_deref()
            .is_some_and(|marker| marker.trim().eq_ignore_ascii_case(NOT_NULL_MARKER))
    }
}

/// List the `.csv` files of a mapping folder, sorted by file name.
pub fn list_mapping_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::MappingFolderNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IngestError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|path| file_order_key(path));
    Ok(files)
}

/// Numeric prefix first (`10-0-x.csv` after `2-0-y.csv`), then the name.
fn file_order_key(path: &Path) -> (u64, String) {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let prefix: String = name.chars().take_while(char::is_ascii_digit).collect();
    (prefix.parse::<u64>().unwrap_or(u64::MAX), name)
}

/// Load one mapping CSV. All rows must name the same table.
pub fn read_mapping_table(path: &Path) -> Result<MappingTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| IngestError::csv(path, e))?;

    let mut table_name: Option<String> = None;
    let mut rules = Vec::new();
    for result in reader.deserialize::<MappingRow>() {
        let row = result.map_err(|e| IngestError::csv(path, e))?;
        if row.is_blank() {
            continue;
        }
        let not_null = row.is_not_null();
        let rule = MappingRule::new(row.table, row.attribute, not_null, row.field_name)
            .map_err(|source| IngestError::Model {
                path: path.to_path_buf(),
                source,
            })?;
        match &table_name {
            Some(expected) if *expected != rule.table => {
                return Err(IngestError::MixedTables {
                    path: path.to_path_buf(),
                    expected: expected.clone(),
                    found: rule.table,
                });
            }
            Some(_) => {}
            None => table_name = Some(rule.table.clone()),
        }
        rules.push(rule);
    }

    let Some(table) = table_name else {
        return Err(IngestError::EmptyMappingFile {
            path: path.to_path_buf(),
        });
    };
    debug!(
        path = %path.display(),
        table = %table,
        rules = rules.len(),
        mapped = rules.iter().filter(|rule| rule.expression.is_some()).count(),
        "mapping table loaded"
    );
    Ok(MappingTable { table, rules })
}

/// Load every mapping table of a folder in file-name order.
pub fn load_mapping_tables(dir: &Path) -> Result<Vec<MappingTable>> {
    let span = info_span!("load_mappings", dir = %dir.display());
    let _guard = span.enter();
    list_mapping_files(dir)?
        .iter()
        .map(|path| read_mapping_table(path))
        .collect()
}
