//! Empty mapping tables generated from a SQL schema.
//!
//! Every `CREATE TABLE` becomes `<n>-0-<table>.csv` with one row per column,
//! `NotNull` filled from the column's `NOT NULL` constraint and an empty
//! `field_name` left for the mapping author.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sqlparser::ast::{ColumnOption, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::{debug, info};

/// One column of a destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    pub not_null: bool,
}

/// One destination table, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTable {
    pub name: String,
    pub columns: Vec<SchemaColumn>,
}

/// Extract the tables declared by `CREATE TABLE` statements.
pub fn parse_schema(sql: &str) -> Result<Vec<SchemaTable>> {
    let dialect = SQLiteDialect {};
    let statements = Parser::parse_sql(&dialect, sql).context("parse SQL schema")?;
    let mut tables = Vec::new();
    for statement in statements {
        let Statement::CreateTable(create_table) = statement else {
            continue;
        };
        let name = unquote(&create_table.name.to_string());
        if name == "sqlite_sequence" {
            continue;
        }
        let columns = create_table
            .columns
            .iter()
            .map(|column| SchemaColumn {
                name: column.name.value.clone(),
                not_null: column
                    .options
                    .iter()
                    .any(|option| matches!(option.option, ColumnOption::NotNull)),
            })
            .collect();
        tables.push(SchemaTable { name, columns });
    }
    Ok(tables)
}

/// Last component of a possibly qualified, possibly quoted name.
fn unquote(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name);
    last.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
        .to_string()
}

/// Write one mapping CSV per table into `out_dir`.
///
/// Refuses to touch a folder that already has entries.
pub fn write_mapping_templates(tables: &[SchemaTable], out_dir: &Path) -> Result<Vec<PathBuf>> {
    if out_dir.exists() {
        let mut entries = std::fs::read_dir(out_dir)
            .with_context(|| format!("read {}", out_dir.display()))?;
        if entries.next().is_some() {
            bail!(
                "{} is not empty; remove its files before generating mapping tables",
                out_dir.display()
            );
        }
    } else {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("create {}", out_dir.display()))?;
    }

    let mut written = Vec::with_capacity(tables.len());
    for (index, table) in tables.iter().enumerate() {
        let path = out_dir.join(format!("{index}-0-{}.csv", table.name));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("create {}", path.display()))?;
        writer.write_record(["Table", "Attribute", "NotNull", "field_name"])?;
        for column in &table.columns {
            let not_null = if column.not_null { "NOT NULL" } else { "" };
            writer.write_record([table.name.as_str(), column.name.as_str(), not_null, ""])?;
        }
        writer
            .flush()
            .with_context(|| format!("write {}", path.display()))?;
        debug!(table = %table.name, columns = table.columns.len(), path = %path.display(), "mapping template written");
        written.push(path);
    }
    info!(tables = written.len(), out_dir = %out_dir.display(), "mapping templates written");
    Ok(written)
}

/// Read a schema file and write its mapping templates.
pub fn scaffold(schema: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let sql = std::fs::read_to_string(schema)
        .with_context(|| format!("read schema {}", schema.display()))?;
    let tables = parse_schema(&sql)?;
    if tables.is_empty() {
        bail!("{} has no CREATE TABLE statements", schema.display());
    }
    write_mapping_templates(&tables, out_dir)
}
