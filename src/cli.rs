//! Command-line interface

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gcodeprep_preprocessor::{Pipeline, PipelineCatalog, PipelineOptions, PipelineReport};
use gcodeprep_settings::Config;

/// Normalize slicer G-code for the firmware encoder
#[derive(Debug, Parser)]
#[command(name = "gcodeprep", version, about)]
pub struct Cli {
    /// Input G-code file
    #[arg(required_unless_present = "list")]
    pub input: Option<PathBuf>,

    /// Output G-code file (may equal the input)
    #[arg(required_unless_present = "list")]
    pub output: Option<PathBuf>,

    /// Slicer dialect (defaults to the configured dialect)
    #[arg(short, long, conflicts_with = "stages")]
    pub dialect: Option<String>,

    /// Comma-separated stage names to run instead of a dialect
    #[arg(short, long, value_delimiter = ',')]
    pub stages: Vec<String>,

    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Insert M73 build progress commands
    #[arg(long)]
    pub progress: bool,

    /// List dialects and stages, then exit
    #[arg(long)]
    pub list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Log filter to install, honouring `--verbose` over the config
    pub fn log_level<'a>(&self, config: &'a Config) -> &'a str {
        if self.verbose {
            "debug"
        } else {
            &config.logging.level
        }
    }
}

/// Pipeline options from configuration and flags
pub fn pipeline_options(cli: &Cli, config: &Config) -> PipelineOptions {
    let mut options = PipelineOptions::new()
        .with_extension(config.preprocessing.file_extension.clone())
        .with_progress(cli.progress || config.preprocessing.emit_progress);

    if let Some(dir) = &config.preprocessing.temp_dir {
        options = options.with_temp_dir(dir.clone());
    }
    options
}

/// Build the pipeline selected by the command line
pub fn build_pipeline(catalog: &PipelineCatalog, cli: &Cli, config: &Config) -> Result<Pipeline> {
    let options = pipeline_options(cli, config);

    let pipeline = if cli.stages.is_empty() {
        let dialect = cli
            .dialect
            .as_deref()
            .unwrap_or(&config.preprocessing.default_dialect);
        catalog.create_pipeline(dialect, &options)?
    } else {
        let names: Vec<&str> = cli.stages.iter().map(|s| s.trim()).collect();
        catalog.create_pipeline_from_stages(&names, &options)?
    };

    Ok(pipeline)
}

/// Human-readable listing of the catalog
pub fn describe_catalog(catalog: &PipelineCatalog) -> String {
    let mut out = String::from("Dialects:\n");
    for dialect in catalog.dialects() {
        let stages = catalog.dialect_stages(dialect).unwrap_or_default();
        let _ = writeln!(out, "  {:<14} {}", dialect, stages.join(" -> "));
    }

    out.push_str("Stages:\n");
    for name in catalog.stages() {
        if let Some(stage) = catalog.create_stage(name) {
            let _ = writeln!(out, "  {:<14} {}", name, stage.description());
        }
    }
    out
}

/// Execute a parsed command line
///
/// Returns `None` when only the catalog listing was requested.
pub fn run(cli: &Cli, config: &Config) -> Result<Option<PipelineReport>> {
    let catalog = PipelineCatalog::new();

    if cli.list {
        print!("{}", describe_catalog(&catalog));
        return Ok(None);
    }

    let (Some(input), Some(output)) = (&cli.input, &cli.output) else {
        anyhow::bail!("INPUT and OUTPUT are required");
    };

    let pipeline = build_pipeline(&catalog, cli, config)?;
    let name = pipeline.name().to_string();
    let report = pipeline
        .run(input, output)
        .with_context(|| format!("Pipeline '{}' failed on {}", name, input.display()))?;

    for stage in &report.stages {
        tracing::info!(
            "{}: {} lines read, {} dropped, {} rewritten, {} inserted",
            stage.stage,
            stage.stats.lines_read,
            stage.stats.lines_dropped,
            stage.stats.lines_rewritten,
            stage.stats.lines_inserted + stage.stats.lines_appended
        );
    }

    Ok(Some(report))
}
