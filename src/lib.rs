//! # gcodeprep
//!
//! Normalizes G-code produced by different slicing programs into the dialect
//! understood by the firmware-protocol encoder:
//! - Per-dialect rule tables (Skeinforge 50, slicers with explicit fan control)
//! - Single-pass file stages chained through temporary files
//! - Guaranteed cleanup of intermediate files on every exit path
//!
//! ## Architecture
//!
//! gcodeprep is organized as a workspace with multiple crates:
//!
//! 1. **gcodeprep-core** - Error types and shared constants
//! 2. **gcodeprep-preprocessor** - Line parser, rules, stages, pipelines, dialect catalog
//! 3. **gcodeprep-settings** - Configuration file handling
//! 4. **gcodeprep** - Command-line binary that integrates all crates

pub mod cli;

pub use gcodeprep_core::{Error, PreprocessError, Result};

pub use gcodeprep_preprocessor::{
    parse_line, Action, LineParser, ParsedLine, Pipeline, PipelineCatalog, PipelineOptions,
    PipelineReport, Rule, RuleStage, Stage, StageStats, TriggerCode,
};

pub use gcodeprep_settings::{Config, LoggingSettings, PreprocessingSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr so stdout stays free for listings
/// - RUST_LOG environment variable support, `default_level` otherwise
/// - Pretty or JSON formatting
pub fn init_logging(default_level: &str, json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", default_level, e))?;

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
