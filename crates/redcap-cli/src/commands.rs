use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use redcap_cli::config::{ConfigOverrides, RunConfig};
use redcap_cli::pipeline::{RunOptions, RunReport, load_mapping_set, run_transform};
use redcap_cli::scaffold::scaffold;
use redcap_map::MappingSet;

use crate::cli::{CheckArgs, ScaffoldArgs, TransformArgs};

pub fn run_transform_command(args: &TransformArgs) -> Result<RunReport> {
    let base = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let config = base
        .apply(ConfigOverrides {
            extraction_path: args.extraction.clone(),
            mapping_path: args.mappings.clone(),
            data_path: args.output.clone(),
            workers: args.workers,
            no_sanitize: args.no_sanitize,
            strict_expressions: args.strict_expressions,
        })
        .resolve()?;
    info!(
        extraction = %config.extraction_path.display(),
        mappings = %config.mapping_path.display(),
        output = %config.data_path.display(),
        workers = config.workers,
        "starting transform"
    );
    run_transform(
        &config,
        RunOptions {
            dry_run: args.dry_run,
            progress: io::stderr().is_terminal(),
        },
    )
}

pub fn run_check(args: &CheckArgs) -> Result<MappingSet> {
    load_mapping_set(&args.mappings, args.strict_expressions)
}

pub fn run_scaffold(args: &ScaffoldArgs) -> Result<Vec<PathBuf>> {
    scaffold(&args.schema, &args.out)
}
