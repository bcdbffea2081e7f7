//! # gcodeprep Preprocessor
//!
//! Normalizes slicer-specific G-code into the dialect accepted by the
//! downstream firmware-protocol encoder. Includes the line parser, rule
//! tables, file stages, the temp-file chained pipeline and the dialect catalog.

pub mod gcode;
pub mod utils;

pub use gcode::{
    parse_line, run_stage, Action, LineParser, ParsedLine, Pipeline, PipelineCatalog,
    PipelineOptions, PipelineReport, ProgressStage, Rule, RuleStage, Stage, StageHandle,
    StageReport, StageStats, StartEndBlockRemover, TempFileSet, TriggerCode, Vocabulary,
    SKEINFORGE50_DIALECT, SLICER_DIALECT,
};
pub use utils::{ensure_gcode_file, has_extension, GcodeFileReader};
