use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One fully resolved row destined for one table.
///
/// Attributes keep the order of the mapping rules that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInstance {
    pub table: String,
    pub values: Vec<(String, Value)>,
}

impl EntityInstance {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, attribute: impl Into<String>, value: Value) {
        self.values.push((attribute.into(), value));
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
