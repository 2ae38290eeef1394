//! CLI argument definitions for redcap-etl.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "redcap-etl",
    version,
    about = "Convert flat REDCap exports into per-patient SQL scripts",
    long_about = "Convert a flat REDCap attribute/value export into SQL insert scripts.\n\n\
                  Each destination table is described by a mapping CSV whose expressions\n\
                  (SRCH, __IF, SET_, LIST, GLOB, MULT, AUTO, DROP) say how to fill it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Prefix log lines with timestamps (pretty and compact formats).
    #[arg(long = "log-timestamps", global = true)]
    pub log_timestamps: bool,

    /// Allow export values in log output (they are redacted otherwise).
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Transform an export into per-patient SQL scripts.
    Transform(TransformArgs),

    /// Compile mapping tables and report their rules and problems.
    Check(CheckArgs),

    /// Generate empty mapping tables from a SQL schema.
    Scaffold(ScaffoldArgs),
}

#[derive(Args)]
pub struct TransformArgs {
    /// Configuration file (TOML, or JSON when it ends in .json).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Flat attribute/value export (overrides extraction_path).
    #[arg(long = "extraction", value_name = "PATH")]
    pub extraction: Option<PathBuf>,

    /// Mapping table folder (overrides mapping_path).
    #[arg(long = "mappings", value_name = "DIR")]
    pub mappings: Option<PathBuf>,

    /// Output root (overrides data_path).
    #[arg(long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Worker-pool size (overrides workers).
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Keep quotes and parentheses in export values as they are.
    #[arg(long = "no-sanitize")]
    pub no_sanitize: bool,

    /// Fail on unbalanced parentheses in mapping expressions.
    #[arg(long = "strict-expressions")]
    pub strict_expressions: bool,

    /// Run the whole transform but write no files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Mapping table folder.
    #[arg(long = "mappings", value_name = "DIR")]
    pub mappings: PathBuf,

    /// Treat unbalanced parentheses as errors.
    #[arg(long = "strict-expressions")]
    pub strict_expressions: bool,
}

#[derive(Args)]
pub struct ScaffoldArgs {
    /// SQL file with CREATE TABLE statements.
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: PathBuf,

    /// Empty (or missing) folder for the generated mapping tables.
    #[arg(long = "out", value_name = "DIR")]
    pub out: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
