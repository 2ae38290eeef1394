//! Run configuration.
//!
//! Read from TOML, or from JSON when the file name ends in `.json`. Keys the
//! converter does not use are ignored so an existing `config.json` keeps
//! working. Command-line flags override file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Default worker-pool size.
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Flat attribute/value export.
    #[serde(default)]
    pub extraction_path: Option<PathBuf>,
    /// Folder with one mapping CSV per destination table.
    #[serde(default)]
    pub mapping_path: Option<PathBuf>,
    /// Output root; patient folders go under `<data_path>/Patients`.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_true")]
    pub sanitize_values: bool,
    #[serde(default)]
    pub strict_expressions: bool,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            extraction_path: None,
            mapping_path: None,
            data_path: default_data_path(),
            workers: DEFAULT_WORKERS,
            sanitize_values: true,
            strict_expressions: false,
        }
    }
}

/// Values given on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub extraction_path: Option<PathBuf>,
    pub mapping_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub workers: Option<usize>,
    pub no_sanitize: bool,
    pub strict_expressions: bool,
}

/// A configuration with every required path present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub extraction_path: PathBuf,
    pub mapping_path: PathBuf,
    pub data_path: PathBuf,
    pub workers: usize,
    pub sanitize_values: bool,
    pub strict_expressions: bool,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text).with_context(|| format!("parse config {}", path.display()))
        } else {
            Self::from_toml(&text).with_context(|| format!("parse config {}", path.display()))
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(path) = overrides.extraction_path {
            self.extraction_path = Some(path);
        }
        if let Some(path) = overrides.mapping_path {
            self.mapping_path = Some(path);
        }
        if let Some(path) = overrides.data_path {
            self.data_path = path;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.no_sanitize {
            self.sanitize_values = false;
        }
        if overrides.strict_expressions {
            self.strict_expressions = true;
        }
        self
    }

    /// Check required paths and the worker count.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        let Some(extraction_path) = self.extraction_path else {
            bail!("no extraction export given (set extraction_path or pass --extraction)");
        };
        let Some(mapping_path) = self.mapping_path else {
            bail!("no mapping folder given (set mapping_path or pass --mappings)");
        };
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        Ok(ResolvedConfig {
            extraction_path,
            mapping_path,
            data_path: self.data_path,
            workers: self.workers,
            sanitize_values: self.sanitize_values,
            strict_expressions: self.strict_expressions,
        })
    }
}
