use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One row of a mapping table: how a destination attribute is filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub table: String,
    pub attribute: String,
    pub not_null: bool,
    /// Mapping expression; `None` when the attribute is not mapped.
    pub expression: Option<String>,
}

impl MappingRule {
    pub fn new(
        table: impl Into<String>,
        attribute: impl Into<String>,
        not_null: bool,
        expression: Option<String>,
    ) -> Result<Self, ModelError> {
        let table = table.into().trim().to_string();
        let attribute = attribute.into().trim().to_string();
        if table.is_empty() {
            return Err(ModelError::InvalidTableName(table));
        }
        if attribute.is_empty() {
            return Err(ModelError::InvalidAttribute { table, attribute });
        }
        let expression = expression
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Ok(Self {
            table,
            attribute,
            not_null,
            expression,
        })
    }
}

/// Ordered rules of one destination table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingTable {
    pub table: String,
    pub rules: Vec<MappingRule>,
}
