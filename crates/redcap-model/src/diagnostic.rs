//! Diagnostics raised while turning patient records into entity instances.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl DiagnosticLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

/// What went wrong (or was deliberately skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A field was absent from the scope; resolved to the `NULL` sentinel.
    LookupMiss,
    /// `LIST(...)` found no values; resolved to the `WARN_<field>` marker.
    ListMiss,
    /// Wrong `SRCH`/`__IF` arity or incompatible `__IF` operands.
    MalformedExpression,
    /// A `NOT NULL` attribute had no value; the instance was discarded.
    NotNullViolation,
    /// An attribute resolved to `DROP`; the instance was discarded.
    DropRequested,
    /// Nothing was left after pruning; the instance was skipped.
    EmptyInstance,
    /// Every rule of the table was unmapped or `AUTO`.
    NoActiveRules,
    /// The patient has none of the fields the table references.
    EmptySubset,
    /// A `MULT` field had no occurrence in the candidate instance.
    NoMultOccurrence,
}

impl DiagnosticKind {
    pub fn level(self) -> DiagnosticLevel {
        match self {
            Self::MalformedExpression => DiagnosticLevel::Error,
            Self::LookupMiss
            | Self::ListMiss
            | Self::NotNullViolation
            | Self::NoActiveRules
            | Self::EmptySubset => DiagnosticLevel::Warning,
            Self::DropRequested => DiagnosticLevel::Info,
            Self::EmptyInstance | Self::NoMultOccurrence => DiagnosticLevel::Debug,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LookupMiss => "lookup_miss",
            Self::ListMiss => "list_miss",
            Self::MalformedExpression => "malformed_expression",
            Self::NotNullViolation => "not_null_violation",
            Self::DropRequested => "drop_requested",
            Self::EmptyInstance => "empty_instance",
            Self::NoActiveRules => "no_active_rules",
            Self::EmptySubset => "empty_subset",
            Self::NoMultOccurrence => "no_mult_occurrence",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub table: Option<String>,
    pub attribute: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level: kind.level(),
            kind,
            table: None,
            attribute: None,
            message: message.into(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<5} {:<20} {:<20} {:<20} {}",
            self.level.as_str(),
            self.kind.as_str(),
            self.table.as_deref().unwrap_or("-"),
            self.attribute.as_deref().unwrap_or("-"),
            self.message
        )
    }
}

/// Per-table instance counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub emitted: usize,
    pub not_null_discarded: usize,
    pub drop_discarded: usize,
    pub empty_discarded: usize,
}

impl TableStats {
    pub fn discarded(&self) -> usize {
        self.not_null_discarded + self.drop_discarded + self.empty_discarded
    }

    fn merge(&mut self, other: &TableStats) {
        self.emitted += other.emitted;
        self.not_null_discarded += other.not_null_discarded;
        self.drop_discarded += other.drop_discarded;
        self.empty_discarded += other.empty_discarded;
    }
}

/// Counters for one patient, or for a whole run once merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    pub tables: BTreeMap<String, TableStats>,
    pub lookup_misses: usize,
    pub list_misses: usize,
    pub malformed_expressions: usize,
    pub skipped_tables: usize,
}

impl TransformStats {
    pub fn record_emitted(&mut self, table: &str) {
        self.table_mut(table).emitted += 1;
    }

    /// Update counters for a diagnostic raised while processing `table`.
    pub fn observe(&mut self, table: &str, kind: DiagnosticKind) {
        match kind {
            DiagnosticKind::LookupMiss => self.lookup_misses += 1,
            DiagnosticKind::ListMiss => self.list_misses += 1,
            DiagnosticKind::MalformedExpression => self.malformed_expressions += 1,
            DiagnosticKind::NotNullViolation => self.table_mut(table).not_null_discarded += 1,
            DiagnosticKind::DropRequested => self.table_mut(table).drop_discarded += 1,
            DiagnosticKind::EmptyInstance => self.table_mut(table).empty_discarded += 1,
            DiagnosticKind::NoActiveRules | DiagnosticKind::EmptySubset => {
                self.skipped_tables += 1;
            }
            DiagnosticKind::NoMultOccurrence => {}
        }
    }

    pub fn merge(&mut self, other: &TransformStats) {
        for (table, stats) in &other.tables {
            self.table_mut(table).merge(stats);
        }
        self.lookup_misses += other.lookup_misses;
        self.list_misses += other.list_misses;
        self.malformed_expressions += other.malformed_expressions;
        self.skipped_tables += other.skipped_tables;
    }

    pub fn emitted(&self) -> usize {
        self.tables.values().map(|stats| stats.emitted).sum()
    }

    pub fn discarded(&self) -> usize {
        self.tables.values().map(TableStats::discarded).sum()
    }

    /// Instance counts summed over every table.
    pub fn totals(&self) -> TableStats {
        let mut totals = TableStats::default();
        for stats in self.tables.values() {
            totals.merge(stats);
        }
        totals
    }

    fn table_mut(&mut self, table: &str) -> &mut TableStats {
        self.tables.entry(table.to_string()).or_default()
    }
}
